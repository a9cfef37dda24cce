//! Identifier Sanitizer.
//!
//! Raw names from the document (schema names, operation ids, paths, parameter
//! and property names) become identifiers that are legal and collision-free in
//! every configured consumer language. Assignment order is declaration order,
//! so the same document always yields the same [`NameTable`].

mod reserved;

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::NamingConfig;
use crate::document::HttpMethod;

pub use reserved::{PYTHON_RESERVED_WORDS, RUST_RESERVED_WORDS, ReservedSet, TS_RESERVED_WORDS};

/// Kind of identifier being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeTag {
    /// Type names, including generated params interfaces.
    SchemaType,
    OperationFunction,
    /// Parameter variables of one operation.
    ParameterVariable,
    CacheKeyFunction,
    /// Field identifiers of one object.
    Property,
}

impl ScopeTag {
    fn pascal_case(self) -> bool {
        self == ScopeTag::SchemaType
    }
}

/// A naming scope: identifiers are unique within one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub tag: ScopeTag,
    /// Operation or object the scope belongs to, for per-owner scopes.
    pub owner: Option<String>,
}

impl Scope {
    pub fn schema_types() -> Self {
        Self {
            tag: ScopeTag::SchemaType,
            owner: None,
        }
    }

    pub fn operations() -> Self {
        Self {
            tag: ScopeTag::OperationFunction,
            owner: None,
        }
    }

    pub fn cache_keys() -> Self {
        Self {
            tag: ScopeTag::CacheKeyFunction,
            owner: None,
        }
    }

    pub fn parameters(operation: impl Into<String>) -> Self {
        Self {
            tag: ScopeTag::ParameterVariable,
            owner: Some(operation.into()),
        }
    }

    pub fn properties(owner: impl Into<String>) -> Self {
        Self {
            tag: ScopeTag::Property,
            owner: Some(owner.into()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{:?}({owner})", self.tag),
            None => write!(f, "{:?}", self.tag),
        }
    }
}

/// One assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub raw: String,
    pub identifier: String,
    pub scope: Scope,
    /// 1 for the first holder of a base identifier, 2.. for suffixed ones.
    pub counter: u32,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Sanitize one raw name for `tag`, without collision handling.
///
/// Splits on characters that cannot appear in an identifier, joins the words
/// in the scope's case (PascalCase for types, camelCase otherwise), prefixes a
/// leading digit with `_` and appends the reserved suffix to reserved words
/// until the result is no longer reserved.
/// Underscores and inner capitals are kept, so a valid identifier comes back
/// unchanged.
pub fn sanitize(raw: &str, tag: ScopeTag, config: &NamingConfig) -> String {
    let words: Vec<&str> = raw.split(|c| !is_ident_char(c)).filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return "_empty".to_string();
    }

    let mut ident = String::with_capacity(raw.len());
    for (i, word) in words.iter().enumerate() {
        if i == 0 && !tag.pascal_case() {
            ident.push_str(&lower_first(word));
        } else {
            ident.push_str(&upper_first(word));
        }
    }

    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    let suffix = if config.reserved_suffix.is_empty() {
        "_"
    } else {
        config.reserved_suffix.as_str()
    };
    while config.is_reserved(&ident) {
        ident.push_str(suffix);
    }
    ident
}

/// Operation name for an operation without `operationId`:
/// `GET /users/{userId}` -> `getUsersUserId`.
pub fn derive_operation_name(method: HttpMethod, path: &str) -> String {
    let mut name = method.as_lower().to_string();
    let mut any_segment = false;
    for word in path
        .split('/')
        .flat_map(|segment| segment.split(|c| !is_ident_char(c)))
        .filter(|w| !w.is_empty())
    {
        name.push_str(&upper_first(word));
        any_segment = true;
    }
    if !any_segment {
        name.push_str("Root");
    }
    name
}

/// Every identifier assigned during one generation run.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    entries: Vec<NameEntry>,
    by_key: HashMap<(Scope, String), usize>,
    taken: HashSet<(Scope, String)>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an identifier to `raw` in `scope`.
    pub fn assign(&mut self, scope: &Scope, raw: &str, config: &NamingConfig) -> &NameEntry {
        self.assign_keyed(scope, raw, raw, config)
    }

    /// Assign an identifier to the thing identified by `key` (e.g. a schema
    /// pointer), sanitizing `raw`. Assigning the same key again returns the
    /// existing entry.
    pub fn assign_keyed(
        &mut self,
        scope: &Scope,
        key: &str,
        raw: &str,
        config: &NamingConfig,
    ) -> &NameEntry {
        let lookup = (scope.clone(), key.to_string());
        if let Some(&index) = self.by_key.get(&lookup) {
            return &self.entries[index];
        }

        let base = sanitize(raw, scope.tag, config);
        let mut identifier = base.clone();
        let mut counter = 1;
        while self.taken.contains(&(scope.clone(), comparable(&identifier, config)))
            || config.is_reserved(&identifier)
        {
            counter += 1;
            identifier = config.collision_suffix.apply(&base, counter);
        }

        self.taken
            .insert((scope.clone(), comparable(&identifier, config)));
        self.by_key.insert(lookup, self.entries.len());
        self.entries.push(NameEntry {
            raw: raw.to_string(),
            identifier,
            scope: scope.clone(),
            counter,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn get(&self, scope: &Scope, key: &str) -> Option<&NameEntry> {
        self.by_key
            .get(&(scope.clone(), key.to_string()))
            .map(|&i| &self.entries[i])
    }

    /// Identifier for `key`, or the key itself if it was never assigned.
    pub fn identifier<'a>(&'a self, scope: &Scope, key: &'a str) -> &'a str {
        self.get(scope, key).map_or(key, |e| e.identifier.as_str())
    }

    /// Entries in assignment order.
    pub fn entries(&self) -> &[NameEntry] {
        &self.entries
    }

    pub fn in_scope<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a NameEntry> + 'a {
        self.entries.iter().filter(move |e| &e.scope == scope)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn comparable(identifier: &str, config: &NamingConfig) -> String {
    if config.case_insensitive {
        identifier.to_ascii_lowercase()
    } else {
        identifier.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::CollisionSuffix;

    #[test]
    fn test_reserved_field_names_become_distinct() {
        let config = NamingConfig::with_reserved(&["class", "type", "default"]);
        let mut table = NameTable::new();
        let scope = Scope::properties("#/components/schemas/Widget");
        let ids: Vec<String> = ["class", "type", "default"]
            .iter()
            .map(|raw| table.assign(&scope, raw, &config).identifier.clone())
            .collect();
        assert_eq!(ids, ["class_", "type_", "default_"]);
        for id in &ids {
            assert!(!config.is_reserved(id));
        }
        let raws: Vec<_> = table.entries().iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, ["class", "type", "default"]);
    }

    #[test]
    fn test_suffixed_names_are_rechecked() {
        let config = NamingConfig::with_reserved(&["class", "class_", "item_2"]);
        assert_eq!(sanitize("class", ScopeTag::Property, &config), "class__");

        let mut table = NameTable::new();
        let scope = Scope::properties("#/components/schemas/Widget");
        assert_eq!(table.assign(&scope, "class", &config).identifier, "class__");
        assert_eq!(table.assign(&scope, "item", &config).identifier, "item");
        // `item_2` is reserved, so the second `item` skips to `item_3`.
        let second = table.assign_keyed(&scope, "item#2", "item", &config);
        assert_eq!(second.identifier, "item_3");
        assert_eq!(second.counter, 3);
    }

    #[test]
    fn test_derived_operation_name() {
        assert_eq!(
            derive_operation_name(HttpMethod::Get, "/users/{userId}"),
            "getUsersUserId"
        );
        assert_eq!(
            derive_operation_name(HttpMethod::Delete, "/v1/pets/:petId/tags"),
            "deleteV1PetsPetIdTags"
        );
        assert_eq!(derive_operation_name(HttpMethod::Get, "/"), "getRoot");
        assert_eq!(
            derive_operation_name(HttpMethod::Post, "/user-groups/{group_id}"),
            "postUserGroupsGroup_id"
        );
    }

    #[test]
    fn test_case_conventions() {
        let config = NamingConfig::default();
        assert_eq!(sanitize("pet-store.item", ScopeTag::SchemaType, &config), "PetStoreItem");
        assert_eq!(sanitize("list pets", ScopeTag::OperationFunction, &config), "listPets");
        assert_eq!(sanitize("X-Request-Id", ScopeTag::ParameterVariable, &config), "xRequestId");
        assert_eq!(sanitize("2fa", ScopeTag::Property, &config), "_2fa");
        assert_eq!(sanitize("--", ScopeTag::Property, &config), "_empty");
        assert_eq!(sanitize("delete", ScopeTag::OperationFunction, &config), "delete_");
    }

    #[test]
    fn test_idempotent_for_valid_identifiers() {
        let config = NamingConfig::default();
        for (raw, tag) in [
            ("getUsersUserId", ScopeTag::OperationFunction),
            ("user_id", ScopeTag::Property),
            ("PetStore", ScopeTag::SchemaType),
            ("HTTPResponse", ScopeTag::SchemaType),
            ("class_", ScopeTag::Property),
        ] {
            let once = sanitize(raw, tag, &config);
            assert_eq!(once, raw);
            assert_eq!(sanitize(&once, tag, &config), once);
        }
    }

    #[test]
    fn test_collisions_in_declaration_order() {
        let config = NamingConfig::default();
        let mut table = NameTable::new();
        let scope = Scope::schema_types();
        assert_eq!(table.assign(&scope, "pet", &config).identifier, "Pet");
        assert_eq!(table.assign(&scope, "Pet", &config).identifier, "Pet_2");
        let third = table.assign(&scope, "pet.", &config);
        assert_eq!(third.identifier, "Pet_3");
        assert_eq!(third.counter, 3);
        // Same raw name again: same entry, no new suffix.
        assert_eq!(table.assign(&scope, "Pet", &config).identifier, "Pet_2");
        assert_eq!(table.len(), 3);
        // Other scopes are independent.
        assert_eq!(
            table.assign(&Scope::operations(), "pet", &config).identifier,
            "pet"
        );
    }

    #[test]
    fn test_case_insensitive_and_plain_suffix() {
        let config = NamingConfig {
            case_insensitive: true,
            collision_suffix: CollisionSuffix::Plain,
            ..NamingConfig::default()
        };
        let mut table = NameTable::new();
        let scope = Scope::schema_types();
        assert_eq!(table.assign(&scope, "PetId", &config).identifier, "PetId");
        assert_eq!(table.assign(&scope, "PetID", &config).identifier, "PetID2");

        let strict = NamingConfig::default();
        let mut table = NameTable::new();
        table.assign(&scope, "PetId", &strict);
        assert_eq!(table.assign(&scope, "PetID", &strict).identifier, "PetID");
    }

    #[test]
    fn test_keyed_assignment_and_owner_scopes() {
        let config = NamingConfig::default();
        let mut table = NameTable::new();
        let types = Scope::schema_types();
        table.assign_keyed(&types, "#/components/schemas/schema", "schema", &config);
        let other = table
            .assign_keyed(&types, "#/x-shared/schema", "schema", &config)
            .identifier
            .clone();
        assert_eq!(other, "Schema_2");
        assert_eq!(table.identifier(&types, "#/x-shared/schema"), "Schema_2");

        let a = Scope::parameters("listPets");
        let b = Scope::parameters("getPet");
        assert_eq!(table.assign(&a, "limit", &config).identifier, "limit");
        assert_eq!(table.assign(&b, "limit", &config).identifier, "limit");
        assert_eq!(table.in_scope(&a).count(), 1);
    }

    #[test]
    fn test_deterministic() {
        let config = NamingConfig::default();
        let raws = ["user", "User", "user-name", "userName", "class", "2nd"];
        let run = || {
            let mut table = NameTable::new();
            for raw in raws {
                table.assign(&Scope::properties("X"), raw, &config);
            }
            table.entries().to_vec()
        };
        assert_eq!(run(), run());
    }
}
