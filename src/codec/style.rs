//! Parameter locations and serialization styles.

use std::fmt;

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Path,
    Query,
    Header,
    Cookie,
}

impl Location {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Location::Path),
            "query" => Some(Location::Query),
            "header" => Some(Location::Header),
            "cookie" => Some(Location::Cookie),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Header => "header",
            Location::Cookie => "cookie",
        }
    }

    /// Style used when the parameter does not declare one.
    ///
    /// Cookies follow the header rules.
    pub fn default_style(self) -> Style {
        match self {
            Location::Path | Location::Header | Location::Cookie => Style::Simple,
            Location::Query => Style::Form,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Simple,
    Label,
    Matrix,
    Form,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl Style {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "simple" => Some(Style::Simple),
            "label" => Some(Style::Label),
            "matrix" => Some(Style::Matrix),
            "form" => Some(Style::Form),
            "spaceDelimited" => Some(Style::SpaceDelimited),
            "pipeDelimited" => Some(Style::PipeDelimited),
            "deepObject" => Some(Style::DeepObject),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Style::Simple => "simple",
            Style::Label => "label",
            Style::Matrix => "matrix",
            Style::Form => "form",
            Style::SpaceDelimited => "spaceDelimited",
            Style::PipeDelimited => "pipeDelimited",
            Style::DeepObject => "deepObject",
        }
    }

    pub fn default_explode(self) -> bool {
        matches!(self, Style::Form | Style::DeepObject)
    }

    pub fn allowed_in(self, location: Location) -> bool {
        match self {
            Style::Simple => matches!(
                location,
                Location::Path | Location::Header | Location::Cookie
            ),
            Style::Label | Style::Matrix => location == Location::Path,
            Style::Form => matches!(location, Location::Query | Location::Cookie),
            Style::SpaceDelimited | Style::PipeDelimited | Style::DeepObject => {
                location == Location::Query
            }
        }
    }

    /// Styles whose encoding is a list of `name=value` pairs.
    pub fn is_pair_based(self) -> bool {
        matches!(
            self,
            Style::Form | Style::SpaceDelimited | Style::PipeDelimited | Style::DeepObject
        )
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
