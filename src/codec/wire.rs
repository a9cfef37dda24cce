//! Reference encoder/decoder for the style matrix.
//!
//! Values are percent-encoded (the RFC 3986 unreserved set stays literal);
//! separators are written literally. Errors are plain reasons, the caller
//! attaches the parameter name.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde_json::{Map, Number, Value};

use super::shape::WireShape;
use super::style::Style;
use crate::types::Scalar;

type WireResult<T> = std::result::Result<T, String>;

/// Everything except the unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Label style separates with `.`, so values must escape it.
const LABEL_COMPONENT: &AsciiSet = &COMPONENT.add(b'.');

fn escape(text: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(text, set).to_string()
}

fn unescape(text: &str) -> WireResult<String> {
    percent_decode_str(text)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| format!("invalid percent-encoding in '{text}': {e}"))
}

/// A value flattened to escaped text, ready to be joined with separators.
enum Flat {
    Scalar(String),
    List(Vec<String>),
    Pairs(Vec<(String, String)>),
}

fn scalar_text(value: &Value) -> WireResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => {
            Err("nested values need the deepObject style".to_string())
        }
    }
}

fn flatten(value: &Value, shape: &WireShape, style: Style) -> WireResult<Flat> {
    let set = if style == Style::Label {
        LABEL_COMPONENT
    } else {
        COMPONENT
    };
    let text = |v: &Value| -> WireResult<String> {
        let escaped = escape(&scalar_text(v)?, set);
        Ok(if style == Style::SpaceDelimited {
            escaped.replace("%20", "+")
        } else {
            escaped
        })
    };

    match (shape, value) {
        (WireShape::Array(_), Value::Array(items)) => {
            Ok(Flat::List(items.iter().map(text).collect::<WireResult<_>>()?))
        }
        (WireShape::Object(_) | WireShape::Map(_), Value::Object(entries)) => Ok(Flat::Pairs(
            entries
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| Ok((escape(k, set), text(v)?)))
                .collect::<WireResult<_>>()?,
        )),
        (WireShape::Scalar(_) | WireShape::Text, v) if !v.is_array() && !v.is_object() => {
            Ok(Flat::Scalar(text(v)?))
        }
        (_, v) => Err(format!("value {v} does not match the declared schema")),
    }
}

fn pairs_joined(pairs: &[(String, String)], inner: &str, outer: &str) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}{inner}{v}"))
        .collect::<Vec<_>>()
        .join(outer)
}

pub(crate) fn encode(
    name: &str,
    style: Style,
    explode: bool,
    shape: &WireShape,
    value: &Value,
) -> WireResult<String> {
    if value.is_null() {
        return Ok(String::new());
    }
    let name = escape(name, COMPONENT);

    if style == Style::DeepObject {
        let mut pairs = Vec::new();
        encode_deep(&name, value, &mut pairs)?;
        return Ok(pairs_joined(&pairs, "=", "&"));
    }

    let encoded = match (style, flatten(value, shape, style)?) {
        (Style::Simple, Flat::Scalar(v)) => v,
        (Style::Simple, Flat::List(items)) => items.join(","),
        (Style::Simple, Flat::Pairs(pairs)) if explode => pairs_joined(&pairs, "=", ","),
        (Style::Simple, Flat::Pairs(pairs)) => pairs_joined(&pairs, ",", ","),

        (Style::Label, Flat::Scalar(v)) => format!(".{v}"),
        (Style::Label, Flat::List(items)) => format!(".{}", items.join(".")),
        (Style::Label, Flat::Pairs(pairs)) if explode => {
            format!(".{}", pairs_joined(&pairs, "=", "."))
        }
        (Style::Label, Flat::Pairs(pairs)) => format!(".{}", pairs_joined(&pairs, ".", ".")),

        (Style::Matrix, Flat::Scalar(v)) => format!(";{name}={v}"),
        (Style::Matrix, Flat::List(items)) if explode && !items.is_empty() => items
            .iter()
            .map(|v| format!(";{name}={v}"))
            .collect::<String>(),
        (Style::Matrix, Flat::List(items)) => format!(";{name}={}", items.join(",")),
        (Style::Matrix, Flat::Pairs(pairs)) if explode => {
            format!(";{}", pairs_joined(&pairs, "=", ";"))
        }

        (Style::Form, Flat::Scalar(v)) => format!("{name}={v}"),
        (Style::Form, Flat::List(items)) if explode && !items.is_empty() => items
            .iter()
            .map(|v| format!("{name}={v}"))
            .collect::<Vec<_>>()
            .join("&"),
        (Style::Form, Flat::List(items)) => format!("{name}={}", items.join(",")),
        (Style::Form, Flat::Pairs(pairs)) if explode => pairs_joined(&pairs, "=", "&"),
        (Style::Form, Flat::Pairs(pairs)) => format!("{name}={}", pairs_joined(&pairs, ",", ",")),

        (Style::SpaceDelimited, Flat::List(items)) => format!("{name}={}", items.join("%20")),
        (Style::PipeDelimited, Flat::List(items)) => format!("{name}={}", items.join("|")),

        _ => return Err(format!("{style} cannot encode this value")),
    };
    Ok(encoded)
}

fn encode_deep(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) -> WireResult<()> {
    match value {
        Value::Object(entries) => {
            for (key, nested) in entries {
                encode_deep(&format!("{prefix}[{}]", escape(key, COMPONENT)), nested, out)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                if item.is_array() || item.is_object() {
                    return Err("arrays inside deepObject values may only hold scalars".into());
                }
                out.push((prefix.to_string(), escape(&scalar_text(item)?, COMPONENT)));
            }
        }
        Value::Null => {}
        scalar => out.push((prefix.to_string(), escape(&scalar_text(scalar)?, COMPONENT))),
    }
    Ok(())
}

/// Parse unescaped text according to the expected shape.
fn parse_scalar(text: &str, shape: &WireShape) -> WireResult<Value> {
    let WireShape::Scalar(scalar) = shape else {
        return Ok(Value::String(text.to_string()));
    };
    if scalar.is_integer() {
        return text
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{text}' is not an integer"));
    }
    if scalar.is_numeric() {
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::from(int));
        }
        return text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("'{text}' is not a number"));
    }
    match scalar {
        Scalar::Boolean => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("'{text}' is not a boolean")),
        },
        Scalar::Null if text.is_empty() => Ok(Value::Null),
        _ => Ok(Value::String(text.to_string())),
    }
}

/// An exploded list with no items is written as one empty assignment.
fn exploded<'a, 'b>(values: &'b [&'a str]) -> &'b [&'a str] {
    if values == [""] {
        &[]
    } else {
        values
    }
}

/// Decoded keys become JavaScript object keys on the server side.
fn object_key(key: String) -> WireResult<String> {
    if key == "__proto__" {
        return Err("'__proto__' is not an allowed key".into());
    }
    Ok(key)
}

fn decode_item(raw: &str, shape: &WireShape) -> WireResult<Value> {
    parse_scalar(&unescape(raw)?, shape)
}

fn decode_list(items: &[&str], shape: &WireShape) -> WireResult<Value> {
    let item_shape = match shape {
        WireShape::Array(item) => item.as_ref(),
        _ => &WireShape::Text,
    };
    items
        .iter()
        .map(|raw| decode_item(raw, item_shape))
        .collect::<WireResult<Vec<_>>>()
        .map(Value::Array)
}

fn decode_pairs<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    shape: &WireShape,
) -> WireResult<Value> {
    let mut object = Map::new();
    for (key, raw) in pairs {
        let key = object_key(unescape(key)?)?;
        let member = shape.member(&key).unwrap_or(&WireShape::Text);
        object.insert(key, decode_item(raw, member)?);
    }
    Ok(Value::Object(object))
}

/// `k1,v1,k2,v2`
fn chunk_pairs<'a>(items: &[&'a str]) -> WireResult<Vec<(&'a str, &'a str)>> {
    if items.len() % 2 != 0 {
        return Err("object values need an even number of key/value items".into());
    }
    Ok(items.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

fn split_assignments<'a>(items: &[&'a str]) -> WireResult<Vec<(&'a str, &'a str)>> {
    items
        .iter()
        .map(|&item| {
            item.split_once('=')
                .ok_or_else(|| format!("expected key=value, found '{item}'"))
        })
        .collect()
}

fn split_non_empty<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split(separator).collect()
    }
}

/// Decode a simple/label/matrix/header/cookie value or a query string.
pub(crate) fn decode(
    name: &str,
    style: Style,
    explode: bool,
    shape: &WireShape,
    raw: &str,
) -> WireResult<Value> {
    if style.is_pair_based() {
        return decode_query(name, style, explode, shape, raw);
    }

    match style {
        Style::Simple => decode_delimited(raw, ",", explode, shape),
        Style::Label => {
            let rest = raw
                .strip_prefix('.')
                .ok_or_else(|| format!("label value '{raw}' must start with '.'"))?;
            decode_delimited(rest, ".", explode, shape)
        }
        Style::Matrix => decode_matrix(name, explode, shape, raw),
        _ => Err(format!("{style} is not a path style")),
    }
}

fn decode_delimited(text: &str, separator: &str, explode: bool, shape: &WireShape) -> WireResult<Value> {
    match shape {
        WireShape::Scalar(_) | WireShape::Text => decode_item(text, shape),
        WireShape::Array(_) => decode_list(&split_non_empty(text, separator), shape),
        WireShape::Object(_) | WireShape::Map(_) => {
            let items = split_non_empty(text, separator);
            let pairs = if explode {
                split_assignments(&items)?
            } else {
                chunk_pairs(&items)?
            };
            decode_pairs(pairs, shape)
        }
    }
}

fn decode_matrix(name: &str, explode: bool, shape: &WireShape, raw: &str) -> WireResult<Value> {
    let name = escape(name, COMPONENT);
    let rest = raw
        .strip_prefix(';')
        .ok_or_else(|| format!("matrix value '{raw}' must start with ';'"))?;
    let segments = split_assignments(&split_non_empty(rest, ";"))?;

    match shape {
        WireShape::Scalar(_) | WireShape::Text => {
            let (_, value) = segments
                .iter()
                .find(|(k, _)| *k == name)
                .ok_or_else(|| format!("missing ';{name}='"))?;
            decode_item(value, shape)
        }
        WireShape::Array(_) if explode => {
            let values: Vec<&str> = segments
                .iter()
                .filter(|(k, _)| *k == name)
                .map(|(_, v)| *v)
                .collect();
            decode_list(exploded(&values), shape)
        }
        WireShape::Array(_) => {
            let (_, value) = segments
                .iter()
                .find(|(k, _)| *k == name)
                .ok_or_else(|| format!("missing ';{name}='"))?;
            decode_list(&split_non_empty(value, ","), shape)
        }
        WireShape::Object(_) | WireShape::Map(_) if explode => decode_pairs(segments, shape),
        WireShape::Object(_) | WireShape::Map(_) => {
            Err("matrix objects are only defined with explode=true".into())
        }
    }
}

fn decode_query(
    name: &str,
    style: Style,
    explode: bool,
    shape: &WireShape,
    raw: &str,
) -> WireResult<Value> {
    let name = escape(name, COMPONENT);
    let pairs: Vec<(&str, &str)> = raw
        .trim_start_matches('?')
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| p.split_once('=').unwrap_or((p, "")))
        .collect();
    let own: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| *k == name)
        .map(|(_, v)| *v)
        .collect();

    match (style, shape) {
        (Style::DeepObject, _) => decode_deep(&name, &pairs, shape),
        (_, WireShape::Scalar(_) | WireShape::Text) => match own.first() {
            Some(value) => decode_item(value, shape),
            None => Ok(Value::Null),
        },
        (Style::Form, WireShape::Array(_)) if explode => {
            if own.is_empty() {
                Ok(Value::Null)
            } else {
                decode_list(exploded(&own), shape)
            }
        }
        (Style::Form, WireShape::Object(fields)) if explode => {
            let members: Vec<(&str, &str)> = pairs
                .iter()
                .filter(|(k, _)| unescape(k).is_ok_and(|k| fields.contains_key(&k)))
                .copied()
                .collect();
            if members.is_empty() {
                Ok(Value::Null)
            } else {
                decode_pairs(members, shape)
            }
        }
        (_, _) => {
            let Some(value) = own.first() else {
                return Ok(Value::Null);
            };
            match (style, shape) {
                (Style::SpaceDelimited, WireShape::Array(_)) => {
                    let items: Vec<String> = split_non_empty(value, "%20")
                        .iter()
                        .map(|item| item.replace('+', "%20"))
                        .collect();
                    let items: Vec<&str> = items.iter().map(String::as_str).collect();
                    decode_list(&items, shape)
                }
                (Style::PipeDelimited, WireShape::Array(_)) => {
                    decode_list(&split_non_empty(value, "|"), shape)
                }
                (Style::Form, WireShape::Array(_)) => {
                    decode_list(&split_non_empty(value, ","), shape)
                }
                (Style::Form, WireShape::Object(_) | WireShape::Map(_)) => {
                    decode_pairs(chunk_pairs(&split_non_empty(value, ","))?, shape)
                }
                _ => Err(format!("{style} cannot decode this value")),
            }
        }
    }
}

/// Split `name[a][b]` into `["a", "b"]`.
fn bracket_path<'a>(name: &str, key: &'a str) -> Option<Vec<&'a str>> {
    let mut rest = key.strip_prefix(name)?;
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let end = inner.find(']')?;
        segments.push(&inner[..end]);
        rest = &inner[end + 1..];
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments)
}

fn decode_deep(name: &str, pairs: &[(&str, &str)], shape: &WireShape) -> WireResult<Value> {
    let mut root = Map::new();
    let mut seen = false;
    for (key, raw) in pairs {
        let Some(path) = bracket_path(name, key) else {
            continue;
        };
        seen = true;
        let path = path
            .iter()
            .map(|segment| unescape(segment).and_then(object_key))
            .collect::<WireResult<Vec<_>>>()?;
        insert_deep(&mut root, shape, &path, raw)?;
    }
    Ok(if seen { Value::Object(root) } else { Value::Null })
}

fn insert_deep(
    object: &mut Map<String, Value>,
    shape: &WireShape,
    path: &[String],
    raw: &str,
) -> WireResult<()> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(());
    };
    let member = shape.member(head).unwrap_or(&WireShape::Text);

    if rest.is_empty() {
        match member {
            WireShape::Array(item) => {
                let slot = object
                    .entry(head.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                let Value::Array(items) = slot else {
                    return Err(format!("'{head}' is both a value and a list"));
                };
                items.push(decode_item(raw, item)?);
            }
            _ => {
                object.insert(head.clone(), decode_item(raw, member)?);
            }
        }
        return Ok(());
    }

    let slot = object
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(nested) = slot else {
        return Err(format!("'{head}' is both a value and an object"));
    };
    let nested_shape = match member {
        WireShape::Object(_) | WireShape::Map(_) => member,
        _ => &WireShape::Map(Box::new(WireShape::Text)),
    };
    insert_deep(nested, nested_shape, rest, raw)
}
