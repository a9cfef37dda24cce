//! TypeScript syntax tree the emitters build before printing.
//!
//! - TsType: types (primitives, arrays, unions, objects, ...)
//! - TsExpr: expressions (identifiers, calls, template literals, ...)
//! - TsStmt / TsFunction / TsTypeDef / TsModule: declarations and files

/// TypeScript type representation
#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    /// Primitive types: string, number, boolean, null, void, unknown
    Primitive(TsPrimitive),
    /// Array type: T[]
    Array(Box<TsType>),
    /// Union type: A | B | C
    Union(Vec<TsType>),
    /// Intersection type: A & B & C
    Intersection(Vec<TsType>),
    /// Object type: { foo: string; bar?: number }
    Object(Vec<TsProp>),
    /// Record type: Record<K, V>
    Record {
        key: Box<TsType>,
        value: Box<TsType>,
    },
    /// Literal type: "foo", 42, true
    Literal(TsLiteral),
    /// Named type reference: Pet, Blob, Promise<void>
    Ref(String),
}

impl TsType {
    pub fn string() -> Self {
        TsType::Primitive(TsPrimitive::String)
    }

    pub fn unknown() -> Self {
        TsType::Primitive(TsPrimitive::Unknown)
    }

    /// `T | null`, unless `T` already admits null.
    pub fn or_null(self) -> Self {
        match self {
            TsType::Primitive(TsPrimitive::Null | TsPrimitive::Unknown) => self,
            TsType::Union(mut members) => {
                if !members.contains(&TsType::Primitive(TsPrimitive::Null)) {
                    members.push(TsType::Primitive(TsPrimitive::Null));
                }
                TsType::Union(members)
            }
            other => TsType::Union(vec![other, TsType::Primitive(TsPrimitive::Null)]),
        }
    }
}

/// TypeScript primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsPrimitive {
    String,
    Number,
    Boolean,
    Null,
    Void,
    Unknown,
}

/// Object property definition
#[derive(Debug, Clone, PartialEq)]
pub struct TsProp {
    /// Property key as it appears on the wire; quoted when needed.
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
    pub readonly: bool,
    pub doc: Option<String>,
}

impl TsProp {
    pub fn new(name: impl Into<String>, ty: TsType, optional: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            optional,
            readonly: false,
            doc: None,
        }
    }
}

/// TypeScript literal values
#[derive(Debug, Clone, PartialEq)]
pub enum TsLiteral {
    String(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    Null,
}

/// TypeScript expression
#[derive(Debug, Clone, PartialEq)]
pub enum TsExpr {
    /// Identifier: foo
    Ident(String),
    /// Literal value: "bar", 42
    Literal(TsLiteral),
    /// Function call: foo(a, b)
    Call { callee: Box<TsExpr>, args: Vec<TsExpr> },
    /// Object literal: { a: 1, b: 2 }
    Object(Vec<(String, TsExpr)>),
    /// Member access: foo.bar, foo["bar-baz"], foo?.bar
    Member {
        object: Box<TsExpr>,
        prop: String,
        optional: bool,
    },
    /// Template literal: `${foo}/bar`
    Template(Vec<TemplatePart>),
    /// Spread: ...options
    Spread(Box<TsExpr>),
    /// Array literal: [a, b, c]
    Array(Vec<TsExpr>),
    /// Type cast: expr as Type
    Cast { expr: Box<TsExpr>, ty: TsType },
    /// Raw code that doesn't fit the AST
    Raw(String),
}

impl TsExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        TsExpr::Ident(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        TsExpr::Literal(TsLiteral::String(value.into()))
    }

    pub fn call(callee: &str, args: Vec<TsExpr>) -> Self {
        TsExpr::Call {
            callee: Box::new(TsExpr::ident(callee)),
            args,
        }
    }

    pub fn member(object: TsExpr, prop: impl Into<String>, optional: bool) -> Self {
        TsExpr::Member {
            object: Box::new(object),
            prop: prop.into(),
            optional,
        }
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct TsParam {
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
}

impl TsParam {
    pub fn new(name: impl Into<String>, ty: TsType, optional: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            optional,
        }
    }
}

/// Template literal part
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Static string part
    Static(String),
    /// Dynamic expression part: ${expr}
    Dynamic(TsExpr),
}

/// `import { a, b } from "module";`, optionally `import type`.
#[derive(Debug, Clone, PartialEq)]
pub struct TsImport {
    pub items: Vec<String>,
    pub from: String,
    pub type_only: bool,
}

impl TsImport {
    pub fn new(from: impl Into<String>, names: impl IntoIterator<Item = String>, type_only: bool) -> Self {
        Self {
            items: names.into_iter().collect(),
            from: from.into(),
            type_only,
        }
    }
}

/// Type definition kind
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
    /// interface Foo { ... }
    Interface { properties: Vec<TsProp> },
    /// type Foo = ...
    TypeAlias { ty: TsType },
    /// const Foo = { ... } as const; type Foo = ...
    ConstEnum { values: Vec<(String, TsLiteral)> },
}

/// Type definition
#[derive(Debug, Clone, PartialEq)]
pub struct TsTypeDef {
    pub name: String,
    pub kind: TypeDefKind,
    pub doc: Option<String>,
}

/// Statement in a function body or at module level
#[derive(Debug, Clone, PartialEq)]
pub enum TsStmt {
    /// `const` declaration
    VarDecl {
        name: String,
        ty: Option<TsType>,
        init: TsExpr,
        export: bool,
    },
    Return(Option<TsExpr>),
    /// `if (cond) { ... }`; generated code never needs an else branch.
    If { cond: TsExpr, then_body: Vec<TsStmt> },
    /// Raw code block (for complex patterns that don't fit the AST)
    Raw(String),
}

impl TsStmt {
    pub fn const_decl(name: impl Into<String>, init: TsExpr) -> Self {
        TsStmt::VarDecl {
            name: name.into(),
            ty: None,
            init,
            export: false,
        }
    }
}

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct TsFunction {
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<TsParam>,
    pub return_type: Option<TsType>,
    pub body: Vec<TsStmt>,
    pub is_async: bool,
    pub is_export: bool,
    pub is_arrow: bool,
    /// Rendered as a JSDoc block above the function.
    pub doc: Option<String>,
}

/// Complete TypeScript file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsModule {
    /// Leading line comment, without the `//`.
    pub header: Option<String>,
    pub imports: Vec<TsImport>,
    pub types: Vec<TsTypeDef>,
    /// Module-level statements, printed between the types and the functions.
    pub statements: Vec<TsStmt>,
    pub functions: Vec<TsFunction>,
}
