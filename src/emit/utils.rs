//! Small helpers shared by the TypeScript emitters.

use serde_json::Value;

use super::ast::{TsLiteral, TsPrimitive, TsType};

/// Check if a name needs quoting (or bracket notation) as a property key.
///
/// Returns true if the name:
/// - Is empty
/// - Doesn't start with a letter, underscore, or dollar sign
/// - Contains characters other than alphanumeric, underscore, or dollar sign
pub fn needs_bracket_notation(name: &str) -> bool {
    name.is_empty()
        || !name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Escape a string for use in JavaScript/TypeScript string literals.
pub fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Escape text placed inside a template literal.
pub fn escape_template(s: &str) -> String {
    s.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${")
}

/// Quote a string if needed for use as a property key or enum key.
pub fn quote_if_needed(name: &str) -> String {
    if needs_bracket_notation(name) {
        format!("\"{}\"", escape_js_string(name))
    } else {
        name.to_string()
    }
}

/// Format a property access expression (e.g., `params.foo` or `params["foo-bar"]`).
pub fn format_param_access(obj: &str, prop: &str, required: bool) -> String {
    if needs_bracket_notation(prop) {
        if required {
            format!("{}[\"{}\"]", obj, escape_js_string(prop))
        } else {
            format!("{}?.[\"{}\"]", obj, escape_js_string(prop))
        }
    } else if required {
        format!("{obj}.{prop}")
    } else {
        format!("{obj}?.{prop}")
    }
}

/// Capitalize the first letter of a string.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Convert a JSON enum value to a TypeScript literal.
///
/// Arrays and objects have no literal type; they come back as `None`.
pub fn json_to_literal(value: &Value) -> Option<TsLiteral> {
    match value {
        Value::String(s) => Some(TsLiteral::String(s.clone())),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => TsLiteral::Int(i),
            None => TsLiteral::Number(n.as_f64().unwrap_or_default()),
        }),
        Value::Bool(b) => Some(TsLiteral::Bool(*b)),
        Value::Null => Some(TsLiteral::Null),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Generate a key name for an enum value (used in const enum objects).
pub fn enum_value_to_key(value: &Value, index: usize) -> String {
    match value {
        Value::String(s) if s.is_empty() => "EMPTY".to_string(),
        Value::String(s) => quote_if_needed(s),
        Value::Number(n) => match n.as_i64() {
            Some(i) if i < 0 => format!("VALUE_MINUS_{}", i.unsigned_abs()),
            Some(i) => format!("VALUE_{i}"),
            None => format!("VALUE_{index}"),
        },
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Null => "NULL".to_string(),
        Value::Array(_) | Value::Object(_) => format!("VALUE_{index}"),
    }
}

/// Create a `Record<string, T>` type.
pub fn make_string_record(value_type: TsType) -> TsType {
    TsType::Record {
        key: Box::new(TsType::Primitive(TsPrimitive::String)),
        value: Box::new(value_type),
    }
}

/// Render free text as a JSDoc block at `indent`.
pub fn jsdoc(text: &str, indent: &str) -> String {
    let lines: Vec<&str> = text.trim().lines().map(str::trim_end).collect();
    if lines.len() == 1 {
        return format!("{indent}/** {} */\n", lines[0].replace("*/", "*\\/"));
    }
    let mut out = format!("{indent}/**\n");
    for line in lines {
        let line = line.replace("*/", "*\\/");
        if line.is_empty() {
            out.push_str(&format!("{indent} *\n"));
        } else {
            out.push_str(&format!("{indent} * {line}\n"));
        }
    }
    out.push_str(&format!("{indent} */\n"));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_needs_bracket_notation() {
        assert!(!needs_bracket_notation("foo"));
        assert!(!needs_bracket_notation("_foo"));
        assert!(!needs_bracket_notation("$foo"));
        assert!(!needs_bracket_notation("camelCase"));

        assert!(needs_bracket_notation(""));
        assert!(needs_bracket_notation("123foo"));
        assert!(needs_bracket_notation("foo-bar"));
        assert!(needs_bracket_notation("foo.bar"));
        assert!(needs_bracket_notation("foo bar"));
    }

    #[test]
    fn test_escape_js_string() {
        assert_eq!(escape_js_string("hel\"lo"), "hel\\\"lo");
        assert_eq!(escape_js_string("hel\\lo"), "hel\\\\lo");
        assert_eq!(escape_js_string("a\nb"), "a\\nb");
        assert_eq!(escape_template("`${x}`"), "\\`\\${x}\\`");
    }

    #[test]
    fn test_quote_and_access() {
        assert_eq!(quote_if_needed("foo"), "foo");
        assert_eq!(quote_if_needed("X-Request-Id"), "\"X-Request-Id\"");
        assert_eq!(format_param_access("params", "userId", true), "params.userId");
        assert_eq!(format_param_access("params", "userId", false), "params?.userId");
        assert_eq!(
            format_param_access("params", "foo-bar", false),
            "params?.[\"foo-bar\"]"
        );
    }

    #[test]
    fn test_enum_keys() {
        assert_eq!(enum_value_to_key(&json!("available"), 0), "available");
        assert_eq!(enum_value_to_key(&json!("in-stock"), 1), "\"in-stock\"");
        assert_eq!(enum_value_to_key(&json!(-3), 2), "VALUE_MINUS_3");
        assert_eq!(enum_value_to_key(&json!(1.5), 3), "VALUE_3");
        assert_eq!(json_to_literal(&json!(7)), Some(TsLiteral::Int(7)));
        assert_eq!(json_to_literal(&json!([1])), None);
    }

    #[test]
    fn test_jsdoc() {
        assert_eq!(jsdoc("Find a pet", ""), "/** Find a pet */\n");
        assert_eq!(jsdoc("a\n\nb", "  "), "  /**\n   * a\n   *\n   * b\n   */\n");
    }
}
