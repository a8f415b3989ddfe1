//! Schema catalog model: the structured snapshot materialized from a
//! database's metadata, and ordering helpers over it.

mod order;

pub use order::clear_order;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column metadata.
///
/// Identity is (table, column name), case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Schema name.
    pub schema: String,

    /// Column name.
    pub name: String,

    /// Data type (e.g., "int", "nvarchar", "datetime2").
    pub data_type: String,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Maximum length for string/binary types (-1 for max).
    pub max_length: Option<i32>,

    /// Numeric precision.
    pub precision: Option<i32>,

    /// Numeric scale.
    pub scale: Option<i32>,
}

impl ColumnInfo {
    /// Column equality rule: data type (case-insensitive), nullability, max
    /// length, precision and scale must all match exactly. Any mismatch
    /// classifies the column as "different", never "missing".
    pub fn same_definition(&self, other: &ColumnInfo) -> bool {
        self.data_type.eq_ignore_ascii_case(&other.data_type)
            && self.is_nullable == other.is_nullable
            && self.max_length == other.max_length
            && self.precision == other.precision
            && self.scale == other.scale
    }

    /// Render the full data type for display and staging DDL, e.g.
    /// `NVARCHAR(50)`, `NVARCHAR(MAX)`, `DECIMAL(10,2)`, `INT`.
    pub fn full_data_type(&self) -> String {
        let data_type = self.data_type.to_uppercase();
        match data_type.as_str() {
            "VARCHAR" | "NVARCHAR" | "CHAR" | "NCHAR" | "VARBINARY" | "BINARY" => {
                match self.max_length {
                    Some(-1) => format!("{}(MAX)", data_type),
                    Some(len) => format!("{}({})", data_type, len),
                    None => data_type,
                }
            }
            "DECIMAL" | "NUMERIC" => format!(
                "{}({},{})",
                data_type,
                self.precision.unwrap_or(18),
                self.scale.unwrap_or(0)
            ),
            _ => data_type,
        }
    }

    /// Render a full column definition for staging DDL:
    /// `[name] TYPE NULL|NOT NULL`.
    pub fn definition(&self) -> String {
        format!(
            "{} {} {}",
            quote_ident(&self.name),
            self.full_data_type(),
            if self.is_nullable { "NULL" } else { "NOT NULL" }
        )
    }
}

/// Schema (namespace) metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    /// Schema name.
    pub name: String,
}

/// Index metadata, keyed by (table, index name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub table: String,

    /// Index name.
    pub name: String,
}

/// Foreign key metadata, keyed by constraint name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    /// Constraint name.
    pub name: String,

    /// Referencing (child) table, as a normalized table key.
    pub table: String,

    /// Referencing column names, comma-joined.
    pub columns: String,

    /// Referenced (parent) table, as a normalized table key.
    pub ref_table: String,

    /// Referenced column names, comma-joined.
    pub ref_columns: String,
}

/// Materialized schema metadata for one database at one instant.
///
/// Produced fresh per comparison call and immutable thereafter. Table keys
/// are normalized as `[schema].table`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Ordered columns per table, keyed by `[schema].table`.
    pub tables: BTreeMap<String, Vec<ColumnInfo>>,

    /// Schema names.
    pub schemas: Vec<SchemaInfo>,

    /// Index descriptors.
    pub indexes: Vec<IndexInfo>,

    /// Foreign key descriptors.
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

impl SchemaSnapshot {
    /// Whether a table key exists, exact match on the normalized key.
    pub fn has_table(&self, key: &str) -> bool {
        self.tables.contains_key(key)
    }
}

/// Normalize a table reference as `[schema].table`.
pub fn table_key(schema: &str, table: &str) -> String {
    format!("[{}].{}", schema, table)
}

/// Split a normalized `[schema].table` key back into (schema, table).
///
/// Keys not produced by [`table_key`] are treated as bare table names in the
/// `dbo` schema.
pub fn split_table_key(key: &str) -> (&str, &str) {
    if let Some(rest) = key.strip_prefix('[') {
        if let Some((schema, table)) = rest.split_once("].") {
            return (schema, table);
        }
    }
    ("dbo", key)
}

/// Quote a SQL Server identifier, escaping closing brackets.
///
/// Identifiers cannot be passed as statement parameters, so dynamic SQL must
/// embed them; bracket quoting with `]` doubled prevents injection through
/// object names.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Qualify a table name with schema and proper quoting.
pub fn qualify_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Turn a normalized table key into a safely quoted table reference.
pub fn quote_table_key(key: &str) -> String {
    let (schema, table) = split_table_key(key);
    qualify_table(schema, table)
}
