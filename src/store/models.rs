//! Data models for the symbol store.

use protobuf::Enum;
use scip::types::symbol_information::Kind;
use serde::Serialize;
use sqlx::FromRow;

// ============================================================================
// Row Models
// ============================================================================

/// A symbol row. Every column except the identifier may be NULL.
#[derive(Debug, Clone, FromRow)]
pub struct SymbolRow {
    pub id: i64,
    pub symbol: String,
    pub display_name: Option<String>,
    pub kind: Option<i64>,
    pub documentation: Option<String>,
    pub enclosing_symbol: Option<String>,
}

/// A definition range row joined with its document path.
#[derive(Debug, Clone, FromRow)]
pub struct DefnRangeRow {
    pub relative_path: Option<String>,
    pub start_line: i64,
    pub start_char: i64,
    pub end_line: i64,
    pub end_char: i64,
}

/// A definition range row joined with its symbol's metadata.
#[derive(Debug, Clone, FromRow)]
pub struct FileDefnRow {
    pub symbol: String,
    pub display_name: Option<String>,
    pub kind: Option<i64>,
    pub start_line: i64,
    pub start_char: i64,
    pub end_line: i64,
    pub end_char: i64,
}

/// A chunk blob joined with its document path.
#[derive(Debug, Clone, FromRow)]
pub struct ChunkRow {
    pub id: i64,
    pub relative_path: Option<String>,
    pub occurrences: Vec<u8>,
}

/// A symbol search row with its first known definition site.
#[derive(Debug, Clone, FromRow)]
pub struct SearchRow {
    pub symbol: String,
    pub display_name: Option<String>,
    pub kind: Option<i64>,
    pub file_path: Option<String>,
    pub line: Option<i64>,
}

// ============================================================================
// Query Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Constant,
    Constructor,
    Enum,
    Field,
    Function,
    Interface,
    Method,
    Module,
    Namespace,
    Package,
    Parameter,
    Property,
    Struct,
    Trait,
    Type,
    TypeAlias,
    Variable,
    Other,
    Unknown,
}

impl SymbolKind {
    /// Map a stored SCIP kind number. NULL or unspecified is `Unknown`.
    pub fn from_scip(kind: Option<i64>) -> Self {
        let Some(kind) = kind.and_then(|k| i32::try_from(k).ok()) else {
            return SymbolKind::Unknown;
        };
        match Kind::from_i32(kind) {
            None | Some(Kind::UnspecifiedKind) => SymbolKind::Unknown,
            Some(Kind::Class) => SymbolKind::Class,
            Some(Kind::Constant) => SymbolKind::Constant,
            Some(Kind::Constructor) => SymbolKind::Constructor,
            Some(Kind::Enum) => SymbolKind::Enum,
            Some(Kind::Field) => SymbolKind::Field,
            Some(Kind::Function) => SymbolKind::Function,
            Some(Kind::Interface) => SymbolKind::Interface,
            Some(Kind::Method) => SymbolKind::Method,
            Some(Kind::Module) => SymbolKind::Module,
            Some(Kind::Namespace) => SymbolKind::Namespace,
            Some(Kind::Package) => SymbolKind::Package,
            Some(Kind::Parameter) => SymbolKind::Parameter,
            Some(Kind::Property) => SymbolKind::Property,
            Some(Kind::Struct) => SymbolKind::Struct,
            Some(Kind::Trait) => SymbolKind::Trait,
            Some(Kind::Type) => SymbolKind::Type,
            Some(Kind::TypeAlias) => SymbolKind::TypeAlias,
            Some(Kind::Variable) => SymbolKind::Variable,
            Some(_) => SymbolKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Constant => "constant",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Enum => "enum",
            SymbolKind::Field => "field",
            SymbolKind::Function => "function",
            SymbolKind::Interface => "interface",
            SymbolKind::Method => "method",
            SymbolKind::Module => "module",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Package => "package",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Property => "property",
            SymbolKind::Struct => "struct",
            SymbolKind::Trait => "trait",
            SymbolKind::Type => "type",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Variable => "variable",
            SymbolKind::Other => "other",
            SymbolKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A 0-based source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file_path: Option<String>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

/// A resolved symbol with its definition site, if one is indexed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub symbol: String,
    pub display_name: Option<String>,
    pub kind: SymbolKind,
    pub documentation: Vec<String>,
    pub enclosing_symbol: Option<String>,
    pub location: Option<Location>,
}

impl Symbol {
    /// Display name, falling back to the raw identifier.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.symbol)
    }
}

/// A symbol search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: Option<String>,
    pub line: Option<u32>,
}

/// A non-definition occurrence of a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub symbol: String,
    pub location: Location,
    pub role: String,
}

/// A symbol defined in a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSymbol {
    pub symbol: String,
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
}

/// Row counts of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub documents: i64,
    pub symbols: i64,
    pub mentions: i64,
}

/// Parse a documentation column: a JSON array of blocks, or one plain block.
pub fn parse_documentation(raw: Option<&str>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(text) if text.trim().is_empty() => Vec::new(),
        Some(text) => serde_json::from_str::<Vec<String>>(text).unwrap_or_else(|_| vec![text.to_string()]),
    }
}

/// Clamp a stored integer to a 0-based line/column.
pub fn to_position(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
