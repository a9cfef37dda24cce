//! Parameter Codec.
//!
//! Turns a parameter (location, style, explode, schema) into a [`ParamCodec`]:
//! the wire format description the emitters render, the descriptor of the
//! decoded value, and a reference encoder/decoder used to pin the format down.
//! Combinations OpenAPI leaves undefined are rejected up front.

mod shape;
mod style;
mod wire;

use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::resolve::{NodeId, ReferenceTable};
use crate::types::{TypeDescriptor, map_type};

pub use shape::{ValueKind, WireShape};
pub use style::{Location, Style};

/// A parameter as declared by an operation, after `$ref`s were followed.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: Location,
    /// Raw `style` keyword, if declared.
    pub style: Option<String>,
    pub explode: Option<bool>,
    pub required: bool,
    pub deprecated: bool,
    pub description: Option<String>,
    pub schema: Option<NodeId>,
    /// Media type of a `content`-declared parameter.
    pub media_type: Option<String>,
}

/// How a parameter value is laid out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFormat {
    pub location: Location,
    pub style: Style,
    pub explode: bool,
    pub kind: ValueKind,
    /// Set for `content`-declared parameters, which travel as JSON text.
    pub media_type: Option<String>,
}

impl WireFormat {
    /// Short human description, e.g. `query form (exploded array)`.
    pub fn describe(&self) -> String {
        if let Some(media_type) = &self.media_type {
            return format!("{} {media_type}", self.location);
        }
        let kind = match self.kind {
            ValueKind::Scalar => "scalar",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        let explode = if self.explode { "exploded " } else { "" };
        format!("{} {} ({explode}{kind})", self.location, self.style)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamCodec {
    /// Wire name, never sanitized.
    pub name: String,
    pub required: bool,
    pub wire: WireFormat,
    /// Type of the decoded value; the client encodes and the server decodes this same type.
    pub descriptor: TypeDescriptor,
    pub shape: WireShape,
}

impl ParamCodec {
    /// Serialize `value`.
    ///
    /// Path, header and cookie (simple) parameters yield the bare value text,
    /// query and form-style parameters yield `name=value` pairs joined by `&`.
    /// `null` yields an empty string (the parameter is omitted).
    pub fn encode(&self, value: &Value) -> Result<String> {
        if self.wire.media_type.is_some() {
            return self.encode_json(value);
        }
        wire::encode(
            &self.name,
            self.wire.style,
            self.wire.explode,
            &self.shape,
            value,
        )
        .map_err(|reason| self.codec_error(reason))
    }

    /// Parse what [`ParamCodec::encode`] produced.
    ///
    /// Pair-based styles accept a whole query string and pick their own pairs;
    /// an absent parameter decodes to `null`.
    pub fn decode(&self, raw: &str) -> Result<Value> {
        if self.wire.media_type.is_some() {
            return self.decode_json(raw);
        }
        wire::decode(
            &self.name,
            self.wire.style,
            self.wire.explode,
            &self.shape,
            raw,
        )
        .map_err(|reason| self.codec_error(reason))
    }

    fn encode_json(&self, value: &Value) -> Result<String> {
        if value.is_null() {
            return Ok(String::new());
        }
        let json = serde_json::to_string(value).map_err(|e| self.codec_error(e.to_string()))?;
        let escaped = percent_encoding::utf8_percent_encode(&json, percent_encoding::NON_ALPHANUMERIC)
            .to_string();
        Ok(if self.wire.location == Location::Query {
            format!("{}={escaped}", self.name)
        } else {
            escaped
        })
    }

    fn decode_json(&self, raw: &str) -> Result<Value> {
        let text = if self.wire.location == Location::Query {
            let prefix = format!("{}=", self.name);
            match raw
                .trim_start_matches('?')
                .split('&')
                .find_map(|pair| pair.strip_prefix(prefix.as_str()))
            {
                Some(text) => text,
                None => return Ok(Value::Null),
            }
        } else {
            raw
        };
        let json = percent_encoding::percent_decode_str(text)
            .decode_utf8()
            .map_err(|e| self.codec_error(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| self.codec_error(e.to_string()))
    }

    fn codec_error(&self, reason: String) -> Error {
        Error::Codec {
            parameter: self.name.clone(),
            reason,
        }
    }
}

/// Validate a parameter against the style matrix and build its codec.
///
/// `operation` only labels errors.
pub fn build_codec(operation: &str, parameter: &Parameter, table: &ReferenceTable) -> Result<ParamCodec> {
    let unsupported = |reason: String| Error::unsupported(operation, &parameter.name, reason);

    let Some(schema) = parameter.schema else {
        return Err(unsupported(if parameter.media_type.is_some() {
            "content-encoded parameter has no schema".into()
        } else {
            "parameter declares neither schema nor content".into()
        }));
    };

    let descriptor = map_type(table, schema);
    let shape = shape::wire_shape(table, &descriptor);
    let kind = shape.kind();

    if let Some(media_type) = &parameter.media_type {
        return Ok(ParamCodec {
            name: parameter.name.clone(),
            required: parameter.required,
            wire: WireFormat {
                location: parameter.location,
                style: parameter.location.default_style(),
                explode: false,
                kind,
                media_type: Some(media_type.clone()),
            },
            descriptor,
            shape,
        });
    }

    let style = match &parameter.style {
        Some(raw) => Style::parse(raw).ok_or_else(|| unsupported(format!("unknown style '{raw}'")))?,
        None => parameter.location.default_style(),
    };
    if !style.allowed_in(parameter.location) {
        return Err(unsupported(format!(
            "style {style} is not defined for {} parameters",
            parameter.location
        )));
    }
    let explode = parameter.explode.unwrap_or_else(|| style.default_explode());

    check_combination(parameter.location, style, explode, &shape).map_err(|reason| unsupported(reason.into()))?;

    trace!(
        operation = %operation,
        parameter = %parameter.name,
        style = %style,
        explode,
        "Built parameter codec."
    );

    Ok(ParamCodec {
        name: parameter.name.clone(),
        required: parameter.required,
        wire: WireFormat {
            location: parameter.location,
            style,
            explode,
            kind,
            media_type: None,
        },
        descriptor,
        shape,
    })
}

fn check_combination(
    location: Location,
    style: Style,
    explode: bool,
    shape: &WireShape,
) -> std::result::Result<(), &'static str> {
    let kind = shape.kind();
    match style {
        Style::SpaceDelimited | Style::PipeDelimited => {
            if kind != ValueKind::Array {
                return Err("space/pipe delimited styles only apply to arrays");
            }
            if explode {
                return Err("space/pipe delimited styles are only defined with explode=false");
            }
        }
        Style::DeepObject => {
            if kind != ValueKind::Object {
                return Err("deepObject only applies to objects");
            }
            if !explode {
                return Err("deepObject is only defined with explode=true");
            }
            if !shape.is_deep_encodable() {
                return Err("arrays inside a deepObject may only hold scalars");
            }
            return Ok(());
        }
        Style::Matrix if kind == ValueKind::Object && !explode => {
            return Err("matrix objects are only defined with explode=true");
        }
        // A Cookie header carries one `name=value` per cookie.
        Style::Form if explode && location == Location::Cookie && kind != ValueKind::Scalar => {
            return Err("exploded form cookies only carry scalars");
        }
        Style::Form if explode && matches!(shape, WireShape::Map(_)) => {
            return Err("exploded form objects need declared properties");
        }
        _ => {}
    }
    if !shape.is_flat() {
        return Err("nested arrays and objects need the deepObject style");
    }
    Ok(())
}
