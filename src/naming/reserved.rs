//! Built-in reserved-word sets, one per consumer language.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::Deserialize;

/// TypeScript / JavaScript reserved words that cannot be used as identifiers.
pub static TS_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "break",
        "case",
        "catch",
        "class",
        "const",
        "continue",
        "debugger",
        "default",
        "delete",
        "do",
        "else",
        "enum",
        "export",
        "extends",
        "false",
        "finally",
        "for",
        "function",
        "if",
        "import",
        "in",
        "instanceof",
        "new",
        "null",
        "return",
        "super",
        "switch",
        "this",
        "throw",
        "true",
        "try",
        "typeof",
        "var",
        "void",
        "while",
        "with",
        "yield",
        "let",
        "static",
        "implements",
        "interface",
        "package",
        "private",
        "protected",
        "public",
        "await",
        "async",
        "arguments",
        "eval",
        "undefined",
    ]
    .into_iter()
    .collect()
});

/// Rust keywords (strict and reserved).
pub static RUST_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
        "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do",
        "final", "gen", "macro", "override", "priv", "try", "typeof", "unsized", "virtual",
        "yield",
    ]
    .into_iter()
    .collect()
});

/// Python keywords plus the soft keywords that break generated code.
pub static PYTHON_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield", "match", "case", "type",
    ]
    .into_iter()
    .collect()
});

/// A built-in reserved-word set, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservedSet {
    Typescript,
    Rust,
    Python,
}

impl ReservedSet {
    pub fn words(self) -> &'static HashSet<&'static str> {
        match self {
            ReservedSet::Typescript => &TS_RESERVED_WORDS,
            ReservedSet::Rust => &RUST_RESERVED_WORDS,
            ReservedSet::Python => &PYTHON_RESERVED_WORDS,
        }
    }

    pub fn contains(self, word: &str) -> bool {
        self.words().contains(word)
    }
}
