//! Engine-specific SQL text, behind the [`ScriptProvider`] trait.
//!
//! A provider owns two kinds of SQL: introspection queries that read catalog
//! metadata, and generation queries that ask the database to author its own
//! DDL. Generation queries return the finished statement as their single
//! output value, so type rendering quirks stay inside the engine that has to
//! execute the result.
//!
//! Identifiers cannot travel as statement parameters; the few statements that
//! must embed a table reference take it pre-quoted via [`crate::catalog::quote_table_key`].

mod mssql;

pub use mssql::MssqlScripts;

use crate::error::{Result, SyncError};

/// SQL text catalog for one database engine.
///
/// Query methods return text with positional `@P1`/`@P2`/... placeholders;
/// the caller supplies values at execution time. Statement methods build
/// fully-formed SQL around an already-quoted table reference.
pub trait ScriptProvider: Send + Sync {
    // Introspection

    /// All columns of all user tables, ordered by table then ordinal
    /// position. Columns: schema, table, column, data type, nullability
    /// (`'YES'`/`'NO'`), max length, precision, scale.
    fn table_info_query(&self) -> &str;

    /// All user-defined schema names.
    fn schemas_query(&self) -> &str;

    /// All named indexes: schema, table, index name.
    fn indexes_query(&self) -> &str;

    /// All foreign keys: constraint name, child schema/table, parent
    /// schema/table, child columns, parent columns.
    fn foreign_keys_query(&self) -> &str;

    /// Count of identity columns on one table. Params: `@P1` schema,
    /// `@P2` table.
    fn identity_count_query(&self) -> &str;

    /// Primary key column names of one table, in key order. Params: `@P1`
    /// schema, `@P2` table.
    fn key_columns_query(&self) -> &str;

    /// Exact row count of one table.
    fn count_rows(&self, table_ref: &str) -> String;

    // DDL generation (scalar queries against the source)

    /// CREATE SCHEMA statement for one schema. Params: `@P1` schema name.
    fn create_schema_query(&self) -> &str;

    /// CREATE TABLE statement for one table, all columns in ordinal order.
    /// Params: `@P1` schema, `@P2` table.
    fn create_table_query(&self) -> &str;

    /// ALTER TABLE ADD statement for one column. Params: `@P1` schema,
    /// `@P2` table, `@P3` column.
    fn add_column_query(&self) -> &str;

    /// ALTER TABLE ALTER COLUMN statement for one column. Params: `@P1`
    /// schema, `@P2` table, `@P3` column.
    fn alter_column_query(&self) -> &str;

    /// CREATE INDEX statement for one index, including uniqueness, key and
    /// INCLUDE columns, filter and storage options. Params: `@P1` index
    /// name, `@P2` table name, `@P3` schema name.
    fn create_index_query(&self) -> &str;

    /// ALTER TABLE ADD CONSTRAINT statement for one foreign key. Params:
    /// `@P1` constraint name.
    fn create_foreign_key_query(&self) -> &str;

    // Teardown and data-phase statements (against the target)

    /// DROP statements for every foreign key constraint, one per row.
    fn drop_all_foreign_keys_query(&self) -> &str;

    /// DROP statements for every eligible non-clustered index, one per row.
    /// Primary key and unique constraint indexes are excluded.
    fn drop_all_indexes_query(&self) -> &str;

    /// Disable constraint checking on every table.
    fn disable_constraints(&self) -> &str;

    /// Re-enable constraint checking, revalidating existing rows.
    fn enable_constraints(&self) -> &str;

    /// Toggle IDENTITY_INSERT for one table.
    fn set_identity_insert(&self, table_ref: &str, on: bool) -> String;

    /// Delete all rows from one table.
    fn clear_table(&self, table_ref: &str) -> String;

    /// Stable-windowed extraction of one table's rows, numbering rows with
    /// `ROW_NUMBER() OVER (ORDER BY (SELECT NULL))` and returning those in
    /// the window `[@P1, @P2]` inclusive.
    ///
    /// Row numbering is only stable while the table is not modified
    /// concurrently; online modification during a copy is unsupported.
    fn window_query(&self, table_ref: &str, column_list: &str) -> String;
}

/// Look up the provider for an engine identifier.
pub fn provider_for(engine: &str) -> Result<Box<dyn ScriptProvider>> {
    match engine {
        "mssql" => Ok(Box::new(MssqlScripts)),
        other => Err(SyncError::UnknownEngine(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_for_mssql() {
        assert!(provider_for("mssql").is_ok());
    }

    #[test]
    fn test_provider_for_unknown_engine() {
        let Err(err) = provider_for("oracle") else {
            panic!("expected an error for an unknown engine");
        };
        assert!(matches!(err, SyncError::UnknownEngine(e) if e == "oracle"));
    }
}
