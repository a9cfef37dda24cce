//! The parameter serialization runtime shipped next to the client and the
//! server (`params.ts`).
//!
//! It mirrors the reference codec in `crate::codec`: same escaping, same
//! separators, same handling of absent values. Every generated call passes
//! the wire format computed for that parameter, so the runtime itself holds
//! no per-API knowledge.

use super::ast::{TsExpr, TsLiteral};
use super::typescript::scalar_hint;
use crate::codec::{ParamCodec, ValueKind, WireShape};

pub const PARAMS_PATH: &str = "params.ts";

/// Build the `ParamFormat` literal passed to the runtime for `codec`.
pub fn format_literal(codec: &ParamCodec) -> TsExpr {
    let kind = match codec.wire.kind {
        ValueKind::Scalar => "scalar",
        ValueKind::Array => "array",
        ValueKind::Object => "object",
    };
    let mut props = vec![
        ("style".to_string(), TsExpr::string(codec.wire.style.as_str())),
        (
            "explode".to_string(),
            TsExpr::Literal(TsLiteral::Bool(codec.wire.explode)),
        ),
        ("kind".to_string(), TsExpr::string(kind)),
    ];

    match &codec.shape {
        WireShape::Scalar(_) => {
            props.push(("type".to_string(), TsExpr::string(scalar_hint(&codec.shape))));
        }
        WireShape::Array(item) => {
            props.push(("items".to_string(), TsExpr::string(scalar_hint(item))));
        }
        WireShape::Object(_) | WireShape::Map(_) => props.extend(object_members(&codec.shape)),
        WireShape::Text => {}
    }

    if codec.wire.media_type.is_some() {
        props.push(("json".to_string(), TsExpr::Literal(TsLiteral::Bool(true))));
    }
    TsExpr::Object(props)
}

/// `fields`/`values` entries describing the members of an object shape.
fn object_members(shape: &WireShape) -> Vec<(String, TsExpr)> {
    match shape {
        WireShape::Object(fields) => {
            let members = fields
                .iter()
                .map(|(name, member)| (name.clone(), member_literal(member)))
                .collect();
            vec![("fields".to_string(), TsExpr::Object(members))]
        }
        WireShape::Map(value) => vec![("values".to_string(), member_literal(value))],
        _ => Vec::new(),
    }
}

/// A scalar type, `[item]` for a list, or a nested `{ fields }`/`{ values }` object.
fn member_literal(shape: &WireShape) -> TsExpr {
    match shape {
        WireShape::Array(item) => TsExpr::Array(vec![TsExpr::string(scalar_hint(item))]),
        WireShape::Object(_) | WireShape::Map(_) => TsExpr::Object(object_members(shape)),
        WireShape::Scalar(_) | WireShape::Text => TsExpr::string(scalar_hint(shape)),
    }
}

pub const PARAMS_RUNTIME: &str = r#"// Parameter serialization runtime. Generated by oapigen; do not edit.

export type ParamStyle =
  | "simple"
  | "label"
  | "matrix"
  | "form"
  | "spaceDelimited"
  | "pipeDelimited"
  | "deepObject";

export type ScalarType = "string" | "integer" | "number" | "boolean";

/** Layout of an object member: a scalar type, `[item]` for a list, or a nested object. */
export type MemberFormat = ScalarType | [ScalarType] | ObjectFormat;

export interface ObjectFormat {
  /** Layout of each declared field. */
  fields?: Record<string, MemberFormat>;
  /** Layout of free-form values. */
  values?: MemberFormat;
}

export interface ParamFormat extends ObjectFormat {
  style: ParamStyle;
  explode: boolean;
  kind: "scalar" | "array" | "object";
  /** Scalar type of a scalar value. */
  type?: ScalarType;
  /** Scalar type of array items. */
  items?: ScalarType;
  /** The value travels as percent-encoded JSON. */
  json?: boolean;
}

export class ParamError extends Error {
  param: string;

  constructor(param: string, message: string) {
    super(`parameter '${param}': ${message}`);
    this.name = "ParamError";
    this.param = param;
  }
}

/** Percent-encode everything except the RFC 3986 unreserved characters. */
const escape = (text: string, label = false): string => {
  const out = encodeURIComponent(text).replace(
    /[!'()*]/g,
    (c) => `%${c.charCodeAt(0).toString(16).toUpperCase()}`,
  );
  return label ? out.replace(/\./g, "%2E") : out;
};

const unescape = (param: string, text: string): string => {
  try {
    return decodeURIComponent(text);
  } catch {
    throw new ParamError(param, `invalid percent-encoding in '${text}'`);
  }
};

const text = (value: unknown): string => (value === null || value === undefined ? "" : String(value));

const present = (value: unknown): boolean => value !== null && value !== undefined;

const entries = (value: unknown): [string, unknown][] =>
  Object.entries(value as Record<string, unknown>).filter(([, v]) => present(v));

const split = (value: string, separator: string): string[] => (value === "" ? [] : value.split(separator));

/** An exploded list with no items is written as one empty assignment. */
const exploded = (values: string[]): string[] => (values.length === 1 && values[0] === "" ? [] : values);

const has = (object: object, key: string): boolean => Object.prototype.hasOwnProperty.call(object, key);

/** Decoded objects have no prototype, and `__proto__` is refused as a key. */
const emptyObject = (): Record<string, unknown> => Object.create(null) as Record<string, unknown>;

const objectKey = (param: string, key: string): string => {
  if (key === "__proto__") throw new ParamError(param, "'__proto__' is not an allowed key");
  return key;
};

const parseJson = (param: string, raw: string): unknown => {
  const source = unescape(param, raw);
  try {
    return JSON.parse(source);
  } catch {
    throw new ParamError(param, "value is not valid JSON");
  }
};

/** Serialize a path, header or cookie value. */
export function encodeValue(name: string, value: unknown, format: ParamFormat): string {
  if (!present(value)) return "";
  if (format.json) return escape(JSON.stringify(value));
  const label = format.style === "label";
  const item = (v: unknown) => escape(text(v), label);
  const key = escape(name);

  if (Array.isArray(value)) {
    const items = value.map(item);
    switch (format.style) {
      case "label":
        return `.${items.join(".")}`;
      case "matrix":
        return format.explode && items.length
          ? items.map((v) => `;${key}=${v}`).join("")
          : `;${key}=${items.join(",")}`;
      default:
        return items.join(",");
    }
  }

  if (typeof value === "object") {
    const pairs = entries(value).map(([k, v]) => [escape(k, label), item(v)]);
    const joined = (inner: string, outer: string) => pairs.map(([k, v]) => `${k}${inner}${v}`).join(outer);
    switch (format.style) {
      case "label":
        return `.${format.explode ? joined("=", ".") : joined(".", ".")}`;
      case "matrix":
        return `;${joined("=", ";")}`;
      default:
        return format.explode ? joined("=", ",") : joined(",", ",");
    }
  }

  switch (format.style) {
    case "label":
      return `.${item(value)}`;
    case "matrix":
      return `;${key}=${item(value)}`;
    default:
      return item(value);
  }
}

/** Serialize a query parameter into escaped `name=value` pairs. */
export function encodeQuery(name: string, value: unknown, format: ParamFormat): string[] {
  if (!present(value)) return [];
  const key = escape(name);
  if (format.json) return [`${key}=${escape(JSON.stringify(value))}`];
  const item = (v: unknown) => escape(text(v));

  if (format.style === "deepObject") {
    const out: string[] = [];
    const walk = (prefix: string, v: unknown): void => {
      if (!present(v)) return;
      if (Array.isArray(v)) {
        v.forEach((x) => out.push(`${prefix}=${item(x)}`));
      } else if (typeof v === "object") {
        entries(v).forEach(([k, x]) => walk(`${prefix}[${escape(k)}]`, x));
      } else {
        out.push(`${prefix}=${item(v)}`);
      }
    };
    walk(key, value);
    return out;
  }

  if (Array.isArray(value)) {
    const items = value.map(item);
    switch (format.style) {
      case "spaceDelimited":
        return [`${key}=${items.map((v) => v.replace(/%20/g, "+")).join("%20")}`];
      case "pipeDelimited":
        return [`${key}=${items.join("|")}`];
      default:
        return format.explode && items.length ? items.map((v) => `${key}=${v}`) : [`${key}=${items.join(",")}`];
    }
  }

  if (typeof value === "object") {
    const pairs = entries(value).map(([k, v]) => [escape(k), item(v)]);
    return format.explode
      ? pairs.map(([k, v]) => `${k}=${v}`)
      : [`${key}=${pairs.map(([k, v]) => `${k},${v}`).join(",")}`];
  }

  return [`${key}=${item(value)}`];
}

/** Serialize the cookie parameters of one request into a `Cookie` header value. */
export function encodeCookies(cookies: [string, unknown, ParamFormat][]): string {
  return cookies
    .filter(([, value]) => present(value))
    .map(([name, value, format]) => `${name}=${encodeValue(name, value, format)}`)
    .join("; ");
}

const parseScalar = (param: string, raw: string, type: ScalarType = "string"): unknown => {
  switch (type) {
    case "integer": {
      if (!/^-?\d+$/.test(raw)) throw new ParamError(param, `'${raw}' is not an integer`);
      const n = Number(raw);
      if (!Number.isSafeInteger(n)) throw new ParamError(param, `'${raw}' does not fit a JavaScript number`);
      return n;
    }
    case "number": {
      const n = Number(raw);
      if (raw === "" || Number.isNaN(n)) throw new ParamError(param, `'${raw}' is not a number`);
      return n;
    }
    case "boolean":
      if (raw === "true") return true;
      if (raw === "false") return false;
      throw new ParamError(param, `'${raw}' is not a boolean`);
    default:
      return raw;
  }
};

const decodeItem = (param: string, raw: string, type?: ScalarType): unknown =>
  parseScalar(param, unescape(param, raw), type);

const member = (format: ObjectFormat, key: string): MemberFormat | undefined =>
  format.fields && has(format.fields, key) ? format.fields[key] : format.values;

const memberType = (format: ObjectFormat, key: string): ScalarType | undefined => {
  const layout = member(format, key);
  return typeof layout === "string" ? layout : undefined;
};

/** Undeclared nested members decode as free-form text. */
const nestedFormat = (layout: MemberFormat | undefined): ObjectFormat =>
  typeof layout === "object" && !Array.isArray(layout) ? layout : { values: "string" };

const toObject = (param: string, pairs: [string, string][], format: ObjectFormat): Record<string, unknown> => {
  const out = emptyObject();
  for (const [k, v] of pairs) {
    const key = objectKey(param, unescape(param, k));
    out[key] = decodeItem(param, v, memberType(format, key));
  }
  return out;
};

const assignments = (param: string, items: string[]): [string, string][] =>
  items.map((item) => {
    const i = item.indexOf("=");
    if (i < 0) throw new ParamError(param, `expected key=value, found '${item}'`);
    return [item.slice(0, i), item.slice(i + 1)];
  });

const chunks = (param: string, items: string[]): [string, string][] => {
  if (items.length % 2 !== 0) throw new ParamError(param, "object values need an even number of key/value items");
  const out: [string, string][] = [];
  for (let i = 0; i < items.length; i += 2) out.push([items[i], items[i + 1]]);
  return out;
};

const decodeDelimited = (param: string, value: string, separator: string, format: ParamFormat): unknown => {
  const items = split(value, separator);
  switch (format.kind) {
    case "array":
      return items.map((v) => decodeItem(param, v, format.items));
    case "object":
      return toObject(param, format.explode ? assignments(param, items) : chunks(param, items), format);
    default:
      return decodeItem(param, value, format.type);
  }
};

const decodeMatrix = (param: string, value: string, format: ParamFormat): unknown => {
  if (!value.startsWith(";")) throw new ParamError(param, `matrix value '${value}' must start with ';'`);
  const key = escape(param);
  const segments = assignments(param, split(value.slice(1), ";"));
  const own = segments.filter(([k]) => k === key).map(([, v]) => v);
  switch (format.kind) {
    case "array":
      return format.explode
        ? exploded(own).map((v) => decodeItem(param, v, format.items))
        : split(own[0] ?? "", ",").map((v) => decodeItem(param, v, format.items));
    case "object":
      return toObject(param, segments, format);
    default:
      if (own.length === 0) throw new ParamError(param, `missing ';${key}='`);
      return decodeItem(param, own[0], format.type);
  }
};

/** Parse a raw (still percent-encoded) path, header or cookie value. */
export function decodeValue(param: string, raw: string | undefined, format: ParamFormat): unknown {
  if (raw === undefined || raw === "") return undefined;
  if (format.json) return parseJson(param, raw);
  switch (format.style) {
    case "label":
      if (!raw.startsWith(".")) throw new ParamError(param, `label value '${raw}' must start with '.'`);
      return decodeDelimited(param, raw.slice(1), ".", format);
    case "matrix":
      return decodeMatrix(param, raw, format);
    default:
      return decodeDelimited(param, raw, ",", format);
  }
}

const queryPairs = (query: string): [string, string][] =>
  split(query.replace(/^\?/, ""), "&").map((pair) => {
    const i = pair.indexOf("=");
    return i < 0 ? [pair, ""] : [pair.slice(0, i), pair.slice(i + 1)];
  });

const decodeDeep = (param: string, key: string, pairs: [string, string][], format: ParamFormat): unknown => {
  const root = emptyObject();
  let seen = false;
  for (const [k, v] of pairs) {
    if (!k.startsWith(`${key}[`)) continue;
    const path = [...k.slice(key.length).matchAll(/\[([^\]]*)\]/g)].map((m) =>
      objectKey(param, unescape(param, m[1])),
    );
    if (path.length === 0) continue;
    seen = true;
    let target = root;
    let layout: ObjectFormat = format;
    for (const segment of path.slice(0, -1)) {
      if (!has(target, segment)) target[segment] = emptyObject();
      const next = target[segment];
      if (typeof next !== "object" || next === null || Array.isArray(next))
        throw new ParamError(param, `'${segment}' is both a value and an object`);
      target = next as Record<string, unknown>;
      layout = nestedFormat(member(layout, segment));
    }
    const leaf = path[path.length - 1];
    const leafLayout = member(layout, leaf);
    if (Array.isArray(leafLayout)) {
      if (!has(target, leaf)) target[leaf] = [];
      const items = target[leaf];
      if (!Array.isArray(items)) throw new ParamError(param, `'${leaf}' is both a value and a list`);
      items.push(decodeItem(param, v, leafLayout[0]));
    } else {
      target[leaf] = decodeItem(param, v, typeof leafLayout === "string" ? leafLayout : undefined);
    }
  }
  return seen ? root : undefined;
};

/** Pick and parse one parameter out of a raw query string. */
export function decodeQuery(param: string, query: string, format: ParamFormat): unknown {
  const key = escape(param);
  const pairs = queryPairs(query);
  const own = pairs.filter(([k]) => k === key).map(([, v]) => v);

  if (format.json) return own.length ? parseJson(param, own[0]) : undefined;
  if (format.style === "deepObject") return decodeDeep(param, key, pairs, format);
  if (format.kind === "scalar") return own.length ? decodeItem(param, own[0], format.type) : undefined;

  if (format.kind === "array") {
    if (format.style === "form" && format.explode) {
      return own.length ? exploded(own).map((v) => decodeItem(param, v, format.items)) : undefined;
    }
    if (!own.length) return undefined;
    switch (format.style) {
      case "spaceDelimited":
        return split(own[0], "%20").map((v) => decodeItem(param, v.replace(/\+/g, "%20"), format.items));
      case "pipeDelimited":
        return split(own[0], "|").map((v) => decodeItem(param, v, format.items));
      default:
        return split(own[0], ",").map((v) => decodeItem(param, v, format.items));
    }
  }

  if (format.explode) {
    const fields = format.fields ?? {};
    const members = pairs.filter(([k]) => has(fields, unescape(param, k)));
    return members.length ? toObject(param, members, format) : undefined;
  }
  return own.length ? toObject(param, chunks(param, split(own[0], ",")), format) : undefined;
}

/** Raw values of the `{name}` segments of `template` in `path`. */
export function matchPath(template: string, path: string): Record<string, string> | undefined {
  const names: string[] = [];
  const source = template
    .split(/(\{[^}]+\})/)
    .map((part) => {
      if (part.startsWith("{") && part.endsWith("}")) {
        names.push(part.slice(1, -1));
        return "([^/]*)";
      }
      return part.replace(/[.*+?^${}()|[\]\\]/g, "\\$&");
    })
    .join("");
  const match = new RegExp(`^${source}/?$`).exec(path);
  if (!match) return undefined;
  return Object.fromEntries(names.map((name, i) => [name, match[i + 1]]));
}

/** Raw value of one cookie in a `Cookie` header. */
export function cookieValue(header: string | undefined, name: string): string | undefined {
  if (!header) return undefined;
  for (const part of header.split(";")) {
    const i = part.indexOf("=");
    if (i >= 0 && part.slice(0, i).trim() === name) return part.slice(i + 1).trim();
  }
  return undefined;
}
"#;
