//! Pure schema comparison between two snapshots.
//!
//! Every function here is side-effect free: two [`SchemaSnapshot`]s in,
//! ordered diff lists out. The diff records carry a tagged [`Script`] state
//! that the script generator later advances from `Pending` to `Ready`.

use crate::catalog::{ColumnInfo, ForeignKeyInfo, IndexInfo, SchemaInfo, SchemaSnapshot};
use serde::Serialize;

/// Generated statement text attached to a diff record.
///
/// A diff record starts `Pending` and becomes `Ready` once the script
/// generator has materialized its statement. Index and foreign key records
/// may legitimately stay `Pending` (the provider resolved no DDL for them)
/// and are skipped at execution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    /// No script has been generated yet.
    #[default]
    Pending,

    /// Ready-to-execute statement text.
    Ready(String),
}

impl Script {
    /// The statement text, if generated.
    pub fn text(&self) -> Option<&str> {
        match self {
            Script::Ready(text) => Some(text),
            Script::Pending => None,
        }
    }

    /// Whether a statement has been attached.
    pub fn is_ready(&self) -> bool {
        matches!(self, Script::Ready(_))
    }
}

/// A schema present in the source but absent from the target.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDifference {
    /// Schema name.
    pub schema: String,

    /// CREATE SCHEMA statement, once generated.
    pub script: Script,
}

/// A table present in the source but absent from the target.
#[derive(Debug, Clone, Serialize)]
pub struct TableDifference {
    /// Normalized table key.
    pub table: String,

    /// CREATE TABLE statement, once generated.
    pub script: Script,
}

/// A column missing from, or defined differently in, the target.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDifference {
    /// Normalized table key.
    pub table: String,

    /// Column name.
    pub column: String,

    /// Rendered source data type, e.g. `NVARCHAR(50)`.
    pub source_type: String,

    /// Rendered target data type, for different (not missing) columns.
    pub target_type: Option<String>,

    /// Source nullability.
    pub is_nullable: bool,

    /// ALTER TABLE ADD / ALTER COLUMN statement, once generated.
    pub script: Script,
}

/// An index present in the source but absent from the target.
#[derive(Debug, Clone, Serialize)]
pub struct IndexDifference {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub table: String,

    /// Index name.
    pub name: String,

    /// CREATE INDEX statement, once generated.
    pub script: Script,
}

/// A foreign key present in the source but absent from the target.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyDifference {
    /// Constraint name.
    pub name: String,

    /// Referencing table key.
    pub table: String,

    /// ALTER TABLE ADD CONSTRAINT statement, once generated.
    pub script: Script,
}

/// Aggregate result of one database comparison.
///
/// The six collections are disjoint in purpose and may each be empty. The
/// result is a snapshot of one comparison instant; it is not re-validated
/// against a live database before use, so it can go stale if the target
/// changes underneath it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonResult {
    pub missing_schemas: Vec<SchemaDifference>,
    pub missing_tables: Vec<TableDifference>,
    pub missing_columns: Vec<ColumnDifference>,
    pub different_columns: Vec<ColumnDifference>,
    pub missing_indexes: Vec<IndexDifference>,
    pub missing_foreign_keys: Vec<ForeignKeyDifference>,
}

impl ComparisonResult {
    /// Whether the two databases are schema-identical.
    pub fn is_empty(&self) -> bool {
        self.missing_schemas.is_empty()
            && self.missing_tables.is_empty()
            && self.missing_columns.is_empty()
            && self.different_columns.is_empty()
            && self.missing_indexes.is_empty()
            && self.missing_foreign_keys.is_empty()
    }

    /// Convert to a pretty JSON string.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Compute the full difference between two snapshots.
pub fn compare(source: &SchemaSnapshot, target: &SchemaSnapshot) -> ComparisonResult {
    ComparisonResult {
        missing_schemas: missing_schemas(&source.schemas, &target.schemas),
        missing_tables: missing_tables(source, target),
        missing_columns: missing_columns(source, target),
        different_columns: different_columns(source, target),
        missing_indexes: missing_indexes(&source.indexes, &target.indexes),
        missing_foreign_keys: missing_foreign_keys(&source.foreign_keys, &target.foreign_keys),
    }
}

/// Schemas present in the source, absent (by name) from the target.
pub fn missing_schemas(source: &[SchemaInfo], target: &[SchemaInfo]) -> Vec<SchemaDifference> {
    source
        .iter()
        .filter(|s| !target.iter().any(|t| t.name == s.name))
        .map(|s| SchemaDifference {
            schema: s.name.clone(),
            script: Script::Pending,
        })
        .collect()
}

/// Table keys present in the source, absent from the target.
pub fn missing_tables(source: &SchemaSnapshot, target: &SchemaSnapshot) -> Vec<TableDifference> {
    source
        .tables
        .keys()
        .filter(|key| !target.has_table(key))
        .map(|key| TableDifference {
            table: key.clone(),
            script: Script::Pending,
        })
        .collect()
}

/// For every table present in both snapshots, source columns whose name has
/// no case-insensitive counterpart in the target's column list.
pub fn missing_columns(source: &SchemaSnapshot, target: &SchemaSnapshot) -> Vec<ColumnDifference> {
    let mut missing = Vec::new();

    for (table, source_columns) in &source.tables {
        let Some(target_columns) = target.tables.get(table) else {
            continue;
        };

        for source_column in source_columns {
            if find_column(target_columns, &source_column.name).is_none() {
                missing.push(ColumnDifference {
                    table: table.clone(),
                    column: source_column.name.clone(),
                    source_type: source_column.full_data_type(),
                    target_type: None,
                    is_nullable: source_column.is_nullable,
                    script: Script::Pending,
                });
            }
        }
    }

    missing
}

/// For every table present in both snapshots, source columns that have a
/// same-named target counterpart failing the equality rule.
pub fn different_columns(
    source: &SchemaSnapshot,
    target: &SchemaSnapshot,
) -> Vec<ColumnDifference> {
    let mut different = Vec::new();

    for (table, source_columns) in &source.tables {
        let Some(target_columns) = target.tables.get(table) else {
            continue;
        };

        for source_column in source_columns {
            let Some(target_column) = find_column(target_columns, &source_column.name) else {
                continue;
            };
            if source_column.same_definition(target_column) {
                continue;
            }

            different.push(ColumnDifference {
                table: table.clone(),
                column: source_column.name.clone(),
                source_type: source_column.full_data_type(),
                target_type: Some(target_column.full_data_type()),
                is_nullable: source_column.is_nullable,
                script: Script::Pending,
            });
        }
    }

    different
}

/// Source indexes whose (table, name) pair is absent from the target.
pub fn missing_indexes(source: &[IndexInfo], target: &[IndexInfo]) -> Vec<IndexDifference> {
    source
        .iter()
        .filter(|s| {
            !target
                .iter()
                .any(|t| t.table == s.table && t.name == s.name)
        })
        .map(|s| IndexDifference {
            schema: s.schema.clone(),
            table: s.table.clone(),
            name: s.name.clone(),
            script: Script::Pending,
        })
        .collect()
}

/// Source foreign keys whose constraint name is absent from the target.
///
/// A proper set difference on both snapshots: foreign keys the target
/// already has are not rescheduled.
pub fn missing_foreign_keys(
    source: &[ForeignKeyInfo],
    target: &[ForeignKeyInfo],
) -> Vec<ForeignKeyDifference> {
    source
        .iter()
        .filter(|s| !target.iter().any(|t| t.name == s.name))
        .map(|s| ForeignKeyDifference {
            name: s.name.clone(),
            table: s.table.clone(),
            script: Script::Pending,
        })
        .collect()
}

fn find_column<'a>(columns: &'a [ColumnInfo], name: &str) -> Option<&'a ColumnInfo> {
    columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::table_key;
    use pretty_assertions::assert_eq;

    fn column(name: &str, data_type: &str, nullable: bool) -> ColumnInfo {
        ColumnInfo {
            schema: "sales".into(),
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: nullable,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    fn snapshot(tables: Vec<(&str, Vec<ColumnInfo>)>) -> SchemaSnapshot {
        let mut snap = SchemaSnapshot::default();
        for (name, columns) in tables {
            snap.tables.insert(table_key("sales", name), columns);
        }
        snap
    }

    #[test]
    fn test_missing_tables() {
        let source = snapshot(vec![
            ("orders", vec![column("id", "int", false)]),
            ("customers", vec![column("id", "int", false)]),
        ]);
        let target = snapshot(vec![("orders", vec![column("id", "int", false)])]);

        let missing = missing_tables(&source, &target);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].table, "[sales].customers");
        assert_eq!(missing[0].script, Script::Pending);
    }

    #[test]
    fn test_missing_and_different_columns_are_disjoint() {
        // `total` exists in both but differs; `notes` is missing from target.
        let mut wide_total = column("total", "decimal", false);
        wide_total.precision = Some(12);
        wide_total.scale = Some(2);
        let mut narrow_total = column("total", "decimal", false);
        narrow_total.precision = Some(10);
        narrow_total.scale = Some(2);

        let source = snapshot(vec![(
            "orders",
            vec![
                column("id", "int", false),
                wide_total,
                column("notes", "nvarchar", true),
            ],
        )]);
        let target = snapshot(vec![(
            "orders",
            vec![column("id", "int", false), narrow_total],
        )]);

        let missing = missing_columns(&source, &target);
        let different = different_columns(&source, &target);

        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].column, "notes");
        assert_eq!(different.len(), 1);
        assert_eq!(different[0].column, "total");
        assert_eq!(different[0].source_type, "DECIMAL(12,2)");
        assert_eq!(different[0].target_type.as_deref(), Some("DECIMAL(10,2)"));

        // No column appears in both collections.
        assert!(!missing.iter().any(|m| m.column == "total"));
        assert!(!different.iter().any(|d| d.column == "notes"));
    }

    #[test]
    fn test_column_match_is_case_insensitive() {
        let source = snapshot(vec![("orders", vec![column("OrderDate", "datetime2", true)])]);
        let target = snapshot(vec![("orders", vec![column("orderdate", "datetime2", true)])]);

        assert!(missing_columns(&source, &target).is_empty());
        assert!(different_columns(&source, &target).is_empty());
    }

    #[test]
    fn test_identical_columns_never_reported_different() {
        let source = snapshot(vec![("orders", vec![column("id", "INT", false)])]);
        let target = snapshot(vec![("orders", vec![column("id", "int", false)])]);
        assert!(different_columns(&source, &target).is_empty());
    }

    #[test]
    fn test_tables_only_in_source_not_scanned_for_columns() {
        let source = snapshot(vec![("customers", vec![column("id", "int", false)])]);
        let target = snapshot(vec![]);
        assert!(missing_columns(&source, &target).is_empty());
    }

    #[test]
    fn test_missing_schemas() {
        let source = vec![
            SchemaInfo { name: "dbo".into() },
            SchemaInfo {
                name: "sales".into(),
            },
        ];
        let target = vec![SchemaInfo { name: "dbo".into() }];
        let missing = missing_schemas(&source, &target);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].schema, "sales");
    }

    #[test]
    fn test_missing_indexes_keyed_by_table_and_name() {
        let idx = |table: &str, name: &str| IndexInfo {
            schema: "sales".into(),
            table: table.into(),
            name: name.into(),
        };
        let source = vec![idx("orders", "ix_orders_date"), idx("orders", "ix_orders_cust")];
        let target = vec![idx("orders", "ix_orders_date"), idx("customers", "ix_orders_cust")];

        let missing = missing_indexes(&source, &target);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "ix_orders_cust");
        assert_eq!(missing[0].table, "orders");
    }

    #[test]
    fn test_missing_foreign_keys_is_a_set_difference() {
        let fk = |name: &str| ForeignKeyInfo {
            name: name.into(),
            table: "[sales].orders".into(),
            columns: "customer_id".into(),
            ref_table: "[sales].customers".into(),
            ref_columns: "id".into(),
        };
        let source = vec![fk("fk_orders_customers"), fk("fk_orders_region")];
        let target = vec![fk("fk_orders_customers")];

        let missing = missing_foreign_keys(&source, &target);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "fk_orders_region");
    }

    #[test]
    fn test_identical_snapshots_compare_empty() {
        let source = snapshot(vec![("orders", vec![column("id", "int", false)])]);
        let result = compare(&source, &source.clone());
        assert!(result.is_empty());
    }

    #[test]
    fn test_script_state_transition() {
        let mut script = Script::Pending;
        assert!(!script.is_ready());
        assert_eq!(script.text(), None);

        script = Script::Ready("CREATE SCHEMA [sales]".into());
        assert!(script.is_ready());
        assert_eq!(script.text(), Some("CREATE SCHEMA [sales]"));
    }
}
