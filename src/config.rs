//! Generator configuration.
//!
//! Everything the core needs from the outside world travels in one
//! [`GeneratorConfig`] value: which emitters run, the reserved-word sets of
//! every consumer, naming toggles and the `allOf` merge policy. There is no
//! module-level mutable state.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::emit::Target;
use crate::error::{Error, Result};
use crate::naming::ReservedSet;
use crate::resolve::MergePolicy;

/// Top-level configuration for one generation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Emitters to run, in output order.
    pub targets: Vec<Target>,
    pub naming: NamingConfig,
    /// Tie-break for conflicting scalar constraints inside `allOf`.
    pub merge_policy: MergePolicy,
    pub emit: EmitConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            targets: Target::ALL.to_vec(),
            naming: NamingConfig::default(),
            merge_policy: MergePolicy::default(),
            emit: EmitConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a TOML configuration file's contents.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::Config("at least one target must be selected".into()));
        }
        for target in &self.targets {
            if let Some(missing) = target
                .requires()
                .iter()
                .find(|required| !self.targets.contains(required))
            {
                return Err(Error::Config(format!(
                    "target '{target}' imports the output of target '{missing}', which is not selected"
                )));
            }
        }
        self.naming.validate()
    }
}

/// Suffix appended to the second and later colliding identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionSuffix {
    /// `name_2`, `name_3`, ...
    #[default]
    Underscore,
    /// `name2`, `name3`, ...
    Plain,
}

impl CollisionSuffix {
    pub fn apply(self, base: &str, counter: u32) -> String {
        match self {
            CollisionSuffix::Underscore => format!("{base}_{counter}"),
            CollisionSuffix::Plain => format!("{base}{counter}"),
        }
    }
}

/// Identifier sanitizer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct NamingConfig {
    /// Built-in reserved-word sets checked simultaneously.
    pub reserved_words: Vec<ReservedSet>,
    /// Additional named reserved-word sets (e.g. a house style guide).
    pub custom_reserved_words: IndexMap<String, Vec<String>>,
    /// Appended to identifiers that hit a reserved word.
    pub reserved_suffix: String,
    pub collision_suffix: CollisionSuffix,
    /// Treat identifiers differing only by case as colliding.
    pub case_insensitive: bool,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            reserved_words: vec![ReservedSet::Typescript],
            custom_reserved_words: IndexMap::new(),
            reserved_suffix: "_".to_string(),
            collision_suffix: CollisionSuffix::default(),
            case_insensitive: false,
        }
    }
}

impl NamingConfig {
    /// A config whose only reserved words are `words`.
    pub fn with_reserved(words: &[&str]) -> Self {
        let mut custom = IndexMap::new();
        custom.insert(
            "custom".to_string(),
            words.iter().map(|w| (*w).to_string()).collect(),
        );
        Self {
            reserved_words: Vec::new(),
            custom_reserved_words: custom,
            ..Self::default()
        }
    }

    /// Exact, case-sensitive match against every configured set.
    pub fn is_reserved(&self, ident: &str) -> bool {
        self.reserved_words.iter().any(|set| set.contains(ident))
            || self
                .custom_reserved_words
                .values()
                .any(|words| words.iter().any(|w| w == ident))
    }

    fn validate(&self) -> Result<()> {
        if self.reserved_suffix.is_empty() {
            return Err(Error::Config("naming.reserved-suffix must not be empty".into()));
        }
        if !self
            .reserved_suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(Error::Config(format!(
                "naming.reserved-suffix '{}' is not identifier-safe",
                self.reserved_suffix
            )));
        }
        Ok(())
    }
}

/// Settings shared by the emitters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct EmitConfig {
    /// Prefix prepended to every request path by the clients (e.g. `/api`).
    pub base_path: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.targets, Target::ALL);
        assert_eq!(config.naming.reserved_suffix, "_");
        assert_eq!(config.merge_policy, MergePolicy::LastWins);
        assert!(config.naming.is_reserved("class"));
        assert!(!config.naming.is_reserved("klass"));
    }

    #[test]
    fn test_from_toml() {
        let config = GeneratorConfig::from_toml_str(
            r#"
targets = ["types", "fetch-client", "react-query"]
merge-policy = "strictest-wins"

[naming]
reserved-words = ["typescript", "python"]
collision-suffix = "plain"
case-insensitive = true

[naming.custom-reserved-words]
house = ["Item"]

[emit]
base-path = "/api"
"#,
        )
        .unwrap();
        assert_eq!(
            config.targets,
            [Target::Types, Target::FetchClient, Target::ReactQuery]
        );
        assert_eq!(config.merge_policy, MergePolicy::StrictestWins);
        assert_eq!(config.naming.collision_suffix, CollisionSuffix::Plain);
        assert!(config.naming.case_insensitive);
        assert!(config.naming.is_reserved("None"));
        assert!(config.naming.is_reserved("Item"));
        assert_eq!(config.emit.base_path, "/api");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            GeneratorConfig::from_toml_str("targets = []"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            GeneratorConfig::from_toml_str("[naming]\nreserved-suffix = \"-\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            GeneratorConfig::from_toml_str("targets = [\"types\", \"react-query\"]"),
            Err(Error::Config(ref reason)) if reason.contains("fetch-client")
        ));
        assert!(matches!(
            GeneratorConfig::from_toml_str("unknown-key = 1"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_collision_suffix() {
        assert_eq!(CollisionSuffix::Underscore.apply("item", 2), "item_2");
        assert_eq!(CollisionSuffix::Plain.apply("item", 3), "item3");
    }
}
