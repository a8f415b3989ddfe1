//! SQL Server script catalog.

use super::ScriptProvider;

/// Column type rendering shared by the DDL generation queries: base type,
/// length/precision suffix, nullability.
const COLUMN_DATA_TYPE: &str = r#"
    DATA_TYPE +
    CASE
        WHEN DATA_TYPE IN ('varchar', 'nvarchar', 'char', 'nchar', 'varbinary', 'binary') THEN
            CASE
                WHEN CHARACTER_MAXIMUM_LENGTH = -1 THEN '(MAX)'
                ELSE '(' + CAST(CHARACTER_MAXIMUM_LENGTH AS VARCHAR) + ')'
            END
        WHEN DATA_TYPE IN ('decimal', 'numeric') THEN
            '(' + CAST(NUMERIC_PRECISION AS VARCHAR) + ',' + CAST(NUMERIC_SCALE AS VARCHAR) + ')'
        ELSE ''
    END +
    CASE WHEN IS_NULLABLE = 'NO' THEN ' NOT NULL' ELSE ' NULL' END"#;

/// Key columns of an index, without INCLUDE columns.
const INDEX_KEY_COLUMNS: &str = r#"
    STUFF((
        SELECT ', [' + c.name + '] ' +
               CASE WHEN ic.is_descending_key = 1 THEN 'DESC' ELSE 'ASC' END
        FROM sys.index_columns ic
        JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id
        WHERE ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 0
        ORDER BY ic.key_ordinal
        FOR XML PATH('')
    ), 1, 2, '')"#;

/// INCLUDE columns of an index.
const INDEX_INCLUDED_COLUMNS: &str = r#"
    STUFF((
        SELECT ', [' + c.name + ']'
        FROM sys.index_columns ic
        JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id
        WHERE ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 1
        ORDER BY ic.key_ordinal
        FOR XML PATH('')
    ), 1, 2, '')"#;

/// Referencing columns of a foreign key, in the child table.
const FK_CHILD_COLUMNS: &str = r#"
    STUFF((
        SELECT ', [' + c.name + ']'
        FROM sys.foreign_key_columns fkc
        JOIN sys.columns c ON fkc.parent_object_id = c.object_id AND fkc.parent_column_id = c.column_id
        WHERE fkc.constraint_object_id = fk.object_id
        ORDER BY fkc.constraint_column_id
        FOR XML PATH('')
    ), 1, 2, '')"#;

/// Referenced columns of a foreign key, in the parent table.
const FK_PARENT_COLUMNS: &str = r#"
    STUFF((
        SELECT ', [' + c.name + ']'
        FROM sys.foreign_key_columns fkc
        JOIN sys.columns c ON fkc.referenced_object_id = c.object_id AND fkc.referenced_column_id = c.column_id
        WHERE fkc.constraint_object_id = fk.object_id
        ORDER BY fkc.constraint_column_id
        FOR XML PATH('')
    ), 1, 2, '')"#;

/// SQL Server implementation of [`ScriptProvider`].
///
/// Introspection goes through `INFORMATION_SCHEMA` and the `sys` catalog
/// views; DDL generation assembles statements inside the engine with `STUFF`
/// and `FOR XML PATH` aggregation.
pub struct MssqlScripts;

impl ScriptProvider for MssqlScripts {
    fn table_info_query(&self) -> &str {
        r#"
        SELECT
            TABLE_SCHEMA,
            TABLE_NAME,
            COLUMN_NAME,
            DATA_TYPE,
            IS_NULLABLE,
            CAST(CHARACTER_MAXIMUM_LENGTH AS INT) AS CHARACTER_MAXIMUM_LENGTH,
            CAST(NUMERIC_PRECISION AS INT) AS NUMERIC_PRECISION,
            CAST(NUMERIC_SCALE AS INT) AS NUMERIC_SCALE
        FROM INFORMATION_SCHEMA.COLUMNS
        ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION"#
    }

    fn schemas_query(&self) -> &str {
        r#"
        SELECT s.name AS SchemaName
        FROM sys.schemas s
        INNER JOIN sys.database_principals p ON s.principal_id = p.principal_id
        WHERE s.name NOT IN ('sys', 'INFORMATION_SCHEMA', 'guest', 'db_owner',
                             'db_accessadmin', 'db_securityadmin', 'db_ddladmin',
                             'db_backupoperator', 'db_datareader', 'db_datawriter',
                             'db_denydatareader', 'db_denydatawriter')
        ORDER BY s.name"#
    }

    fn indexes_query(&self) -> &str {
        r#"
        SELECT
            SCHEMA_NAME(t.schema_id) AS SchemaName,
            t.name AS TableName,
            i.name AS IndexName
        FROM sys.indexes i
        INNER JOIN sys.tables t ON i.object_id = t.object_id
        WHERE i.name IS NOT NULL
        ORDER BY SchemaName, TableName, IndexName"#
    }

    fn foreign_keys_query(&self) -> &str {
        // Column lists use the same correlated aggregation as the DDL
        // generation queries so both sides describe keys identically.
        concat!(
            r#"
        SELECT
            fk.name AS ForeignKeyName,
            OBJECT_SCHEMA_NAME(fk.parent_object_id) AS TableSchema,
            OBJECT_NAME(fk.parent_object_id) AS TableName,
            OBJECT_SCHEMA_NAME(fk.referenced_object_id) AS ReferencedTableSchema,
            OBJECT_NAME(fk.referenced_object_id) AS ReferencedTableName,"#,
            r#"
            STUFF((
                SELECT ', ' + c.name
                FROM sys.foreign_key_columns fkc
                JOIN sys.columns c ON fkc.parent_object_id = c.object_id AND fkc.parent_column_id = c.column_id
                WHERE fkc.constraint_object_id = fk.object_id
                ORDER BY fkc.constraint_column_id
                FOR XML PATH('')
            ), 1, 2, '') AS Columns,
            STUFF((
                SELECT ', ' + c.name
                FROM sys.foreign_key_columns fkc
                JOIN sys.columns c ON fkc.referenced_object_id = c.object_id AND fkc.referenced_column_id = c.column_id
                WHERE fkc.constraint_object_id = fk.object_id
                ORDER BY fkc.constraint_column_id
                FOR XML PATH('')
            ), 1, 2, '') AS ReferencedColumns
        FROM sys.foreign_keys fk
        ORDER BY TableName, ForeignKeyName"#
        )
    }

    fn identity_count_query(&self) -> &str {
        r#"
        SELECT COUNT(*)
        FROM sys.columns c
        JOIN sys.tables t ON c.object_id = t.object_id
        JOIN sys.schemas s ON t.schema_id = s.schema_id
        WHERE s.name = @P1
          AND t.name = @P2
          AND c.is_identity = 1"#
    }

    fn key_columns_query(&self) -> &str {
        r#"
        SELECT c.name
        FROM sys.indexes i
        JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id
        JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id
        JOIN sys.tables t ON i.object_id = t.object_id
        JOIN sys.schemas s ON t.schema_id = s.schema_id
        WHERE i.is_primary_key = 1
          AND s.name = @P1
          AND t.name = @P2
        ORDER BY ic.key_ordinal"#
    }

    fn count_rows(&self, table_ref: &str) -> String {
        format!("SELECT COUNT_BIG(*) FROM {}", table_ref)
    }

    fn create_schema_query(&self) -> &str {
        r#"
        SELECT 'CREATE SCHEMA [' + name + ']' +
               CASE WHEN principal_id > 1 THEN
                   ' AUTHORIZATION [' + USER_NAME(principal_id) + ']'
               ELSE '' END AS CreateSchemaScript
        FROM sys.schemas
        WHERE name = @P1"#
    }

    fn create_table_query(&self) -> &str {
        // Column list assembled in ordinal order inside the engine.
        const QUERY: &str = r#"
        SELECT
            'CREATE TABLE [' + TABLE_SCHEMA + '].[' + TABLE_NAME + '] (' +
            STUFF((
                SELECT ', [' + COLUMN_NAME + '] ' + {type}
                FROM INFORMATION_SCHEMA.COLUMNS c2
                WHERE c2.TABLE_NAME = c.TABLE_NAME AND c2.TABLE_SCHEMA = c.TABLE_SCHEMA
                ORDER BY ORDINAL_POSITION
                FOR XML PATH(''), TYPE
            ).value('.', 'NVARCHAR(MAX)'), 1, 1, '') +
            ');' AS CreateScript
        FROM INFORMATION_SCHEMA.COLUMNS c
        WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
        GROUP BY TABLE_SCHEMA, TABLE_NAME"#;
        static RENDERED: std::sync::OnceLock<String> = std::sync::OnceLock::new();
        RENDERED.get_or_init(|| QUERY.replace("{type}", COLUMN_DATA_TYPE))
    }

    fn add_column_query(&self) -> &str {
        const QUERY: &str = r#"
        SELECT
            'ALTER TABLE [' + TABLE_SCHEMA + '].[' + TABLE_NAME + '] ADD [' + COLUMN_NAME + '] ' +
            {type} AS AddColumnScript
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2 AND COLUMN_NAME = @P3"#;
        static RENDERED: std::sync::OnceLock<String> = std::sync::OnceLock::new();
        RENDERED.get_or_init(|| QUERY.replace("{type}", COLUMN_DATA_TYPE))
    }

    fn alter_column_query(&self) -> &str {
        const QUERY: &str = r#"
        SELECT
            'ALTER TABLE [' + TABLE_SCHEMA + '].[' + TABLE_NAME + '] ALTER COLUMN [' + COLUMN_NAME + '] ' +
            {type} AS AlterColumnScript
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2 AND COLUMN_NAME = @P3"#;
        static RENDERED: std::sync::OnceLock<String> = std::sync::OnceLock::new();
        RENDERED.get_or_init(|| QUERY.replace("{type}", COLUMN_DATA_TYPE))
    }

    fn create_index_query(&self) -> &str {
        const QUERY: &str = r#"
        SELECT
            ('CREATE ' +
            CASE WHEN i.is_unique = 1 THEN 'UNIQUE ' ELSE '' END +
            i.type_desc COLLATE DATABASE_DEFAULT + ' INDEX [' + i.name + '] ' +
            'ON [' + SCHEMA_NAME(t.schema_id) + '].[' + t.name + '] ' +
            '(' + {keys} + ') ' +
            CASE
                WHEN EXISTS (
                    SELECT 1 FROM sys.index_columns ic
                    WHERE ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 1
                ) THEN
                    'INCLUDE (' + {includes} + ') '
                ELSE ''
            END +
            CASE WHEN i.has_filter = 1 THEN 'WHERE ' + i.filter_definition + ' ' ELSE '' END +
            'WITH (' +
            'PAD_INDEX = ' + CASE WHEN i.is_padded = 1 THEN 'ON' ELSE 'OFF' END +
            CASE WHEN i.fill_factor > 0 THEN ', FILLFACTOR = ' + CAST(i.fill_factor AS VARCHAR(3)) ELSE '' END +
            ')') COLLATE DATABASE_DEFAULT AS CreateIndexScript
        FROM sys.indexes i
        JOIN sys.tables t ON i.object_id = t.object_id
        WHERE i.name = @P1
          AND t.name = @P2
          AND SCHEMA_NAME(t.schema_id) = @P3"#;
        static RENDERED: std::sync::OnceLock<String> = std::sync::OnceLock::new();
        RENDERED.get_or_init(|| {
            QUERY
                .replace("{keys}", INDEX_KEY_COLUMNS)
                .replace("{includes}", INDEX_INCLUDED_COLUMNS)
        })
    }

    fn create_foreign_key_query(&self) -> &str {
        const QUERY: &str = r#"
        SELECT
            'ALTER TABLE [' + OBJECT_SCHEMA_NAME(fk.parent_object_id) + '].[' + OBJECT_NAME(fk.parent_object_id) + '] ' +
            'ADD CONSTRAINT [' + fk.name + '] ' +
            'FOREIGN KEY (' + {child} + ') ' +
            'REFERENCES [' + OBJECT_SCHEMA_NAME(fk.referenced_object_id) + '].[' + OBJECT_NAME(fk.referenced_object_id) + '] (' +
            {parent} + ')' AS CreateForeignKeyScript
        FROM sys.foreign_keys fk
        WHERE fk.name = @P1"#;
        static RENDERED: std::sync::OnceLock<String> = std::sync::OnceLock::new();
        RENDERED.get_or_init(|| {
            QUERY
                .replace("{child}", FK_CHILD_COLUMNS)
                .replace("{parent}", FK_PARENT_COLUMNS)
        })
    }

    fn drop_all_foreign_keys_query(&self) -> &str {
        r#"
        SELECT 'ALTER TABLE ' + QUOTENAME(OBJECT_SCHEMA_NAME(parent_object_id)) + '.' + QUOTENAME(OBJECT_NAME(parent_object_id)) +
               ' DROP CONSTRAINT ' + QUOTENAME(name) AS DropForeignKeyScript
        FROM sys.foreign_keys"#
    }

    fn drop_all_indexes_query(&self) -> &str {
        r#"
        SELECT
            'DROP INDEX [' + i.name + '] ON [' + SCHEMA_NAME(t.schema_id) + '].[' + t.name + ']' AS DropIndexScript
        FROM sys.indexes i
        JOIN sys.tables t ON i.object_id = t.object_id
        WHERE i.index_id > 1
          AND i.type IN (2, 6)
          AND i.is_primary_key = 0
          AND i.is_unique_constraint = 0
          AND t.is_ms_shipped = 0"#
    }

    fn disable_constraints(&self) -> &str {
        "EXEC sp_MSforeachtable 'ALTER TABLE ? NOCHECK CONSTRAINT ALL';"
    }

    fn enable_constraints(&self) -> &str {
        "EXEC sp_MSforeachtable 'ALTER TABLE ? WITH CHECK CHECK CONSTRAINT ALL';"
    }

    fn set_identity_insert(&self, table_ref: &str, on: bool) -> String {
        format!(
            "SET IDENTITY_INSERT {} {}",
            table_ref,
            if on { "ON" } else { "OFF" }
        )
    }

    fn clear_table(&self, table_ref: &str) -> String {
        format!("DELETE FROM {}", table_ref)
    }

    fn window_query(&self, table_ref: &str, column_list: &str) -> String {
        format!(
            "SELECT {cols} FROM (\
             SELECT {cols}, ROW_NUMBER() OVER (ORDER BY (SELECT NULL)) AS __rn \
             FROM {table}\
             ) AS numbered WHERE __rn BETWEEN @P1 AND @P2",
            cols = column_list,
            table = table_ref,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_queries_render_placeholders() {
        let scripts = MssqlScripts;
        assert!(scripts.create_table_query().contains("@P2"));
        assert!(!scripts.create_table_query().contains("{type}"));
        assert!(scripts.add_column_query().contains("@P3"));
        assert!(!scripts.create_index_query().contains("{keys}"));
        assert!(!scripts.create_foreign_key_query().contains("{parent}"));
    }

    #[test]
    fn test_create_index_query_filters_by_schema() {
        // Same-named indexes on same-named tables in two schemas must not
        // resolve to the wrong table.
        let sql = MssqlScripts.create_index_query();
        assert!(sql.contains("i.name = @P1"));
        assert!(sql.contains("t.name = @P2"));
        assert!(sql.contains("SCHEMA_NAME(t.schema_id) = @P3"));
    }

    #[test]
    fn test_set_identity_insert() {
        let scripts = MssqlScripts;
        assert_eq!(
            scripts.set_identity_insert("[dbo].[orders]", true),
            "SET IDENTITY_INSERT [dbo].[orders] ON"
        );
        assert_eq!(
            scripts.set_identity_insert("[dbo].[orders]", false),
            "SET IDENTITY_INSERT [dbo].[orders] OFF"
        );
    }

    #[test]
    fn test_window_query_shape() {
        let scripts = MssqlScripts;
        let sql = scripts.window_query("[dbo].[orders]", "[id], [total]");
        assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY (SELECT NULL))"));
        assert!(sql.contains("BETWEEN @P1 AND @P2"));
        assert!(sql.starts_with("SELECT [id], [total] FROM ("));
    }

    #[test]
    fn test_clear_table() {
        assert_eq!(
            MssqlScripts.clear_table("[sales].[orders]"),
            "DELETE FROM [sales].[orders]"
        );
    }
}
