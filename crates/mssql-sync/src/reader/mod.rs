//! Schema snapshot materialization.

use crate::catalog::{table_key, ColumnInfo, ForeignKeyInfo, IndexInfo, SchemaInfo, SchemaSnapshot};
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::scripts::ScriptProvider;
use tracing::info;

/// Reads a full [`SchemaSnapshot`] from a live database.
///
/// Issues the provider's four introspection queries on an open connection
/// and normalizes table references as `[schema].table` keys. Query errors
/// propagate unchanged; there is no retry.
pub struct SchemaReader<'a> {
    provider: &'a dyn ScriptProvider,
}

impl<'a> SchemaReader<'a> {
    pub fn new(provider: &'a dyn ScriptProvider) -> Self {
        Self { provider }
    }

    /// Materialize the snapshot.
    pub async fn read_snapshot(&self, manager: &mut ConnectionManager) -> Result<SchemaSnapshot> {
        let mut snapshot = SchemaSnapshot::default();

        self.read_tables(manager, &mut snapshot).await?;
        self.read_schemas(manager, &mut snapshot).await?;
        self.read_indexes(manager, &mut snapshot).await?;
        self.read_foreign_keys(manager, &mut snapshot).await?;

        info!(
            tables = snapshot.tables.len(),
            schemas = snapshot.schemas.len(),
            indexes = snapshot.indexes.len(),
            foreign_keys = snapshot.foreign_keys.len(),
            "Schema snapshot read"
        );
        Ok(snapshot)
    }

    async fn read_tables(
        &self,
        manager: &mut ConnectionManager,
        snapshot: &mut SchemaSnapshot,
    ) -> Result<()> {
        let rows = manager
            .client()?
            .simple_query(self.provider.table_info_query())
            .await?
            .into_first_result()
            .await?;

        for row in &rows {
            let schema: &str = row.get(0).unwrap_or_default();
            let table: &str = row.get(1).unwrap_or_default();
            let column = ColumnInfo {
                schema: schema.to_string(),
                name: row.get::<&str, usize>(2).unwrap_or_default().to_string(),
                data_type: row.get::<&str, usize>(3).unwrap_or_default().to_string(),
                is_nullable: nullable_flag(row.get(4).unwrap_or_default()),
                max_length: row.get(5),
                precision: row.get(6),
                scale: row.get(7),
            };
            snapshot
                .tables
                .entry(table_key(schema, table))
                .or_default()
                .push(column);
        }
        Ok(())
    }

    async fn read_schemas(
        &self,
        manager: &mut ConnectionManager,
        snapshot: &mut SchemaSnapshot,
    ) -> Result<()> {
        let rows = manager
            .client()?
            .simple_query(self.provider.schemas_query())
            .await?
            .into_first_result()
            .await?;

        snapshot.schemas = rows
            .iter()
            .filter_map(|r| r.get::<&str, usize>(0))
            .map(|name| SchemaInfo {
                name: name.to_string(),
            })
            .collect();
        Ok(())
    }

    async fn read_indexes(
        &self,
        manager: &mut ConnectionManager,
        snapshot: &mut SchemaSnapshot,
    ) -> Result<()> {
        let rows = manager
            .client()?
            .simple_query(self.provider.indexes_query())
            .await?
            .into_first_result()
            .await?;

        snapshot.indexes = rows
            .iter()
            .map(|r| IndexInfo {
                schema: r.get::<&str, usize>(0).unwrap_or_default().to_string(),
                table: r.get::<&str, usize>(1).unwrap_or_default().to_string(),
                name: r.get::<&str, usize>(2).unwrap_or_default().to_string(),
            })
            .collect();
        Ok(())
    }

    async fn read_foreign_keys(
        &self,
        manager: &mut ConnectionManager,
        snapshot: &mut SchemaSnapshot,
    ) -> Result<()> {
        let rows = manager
            .client()?
            .simple_query(self.provider.foreign_keys_query())
            .await?
            .into_first_result()
            .await?;

        snapshot.foreign_keys = rows
            .iter()
            .map(|r| ForeignKeyInfo {
                name: r.get::<&str, usize>(0).unwrap_or_default().to_string(),
                table: table_key(
                    r.get::<&str, usize>(1).unwrap_or_default(),
                    r.get::<&str, usize>(2).unwrap_or_default(),
                ),
                ref_table: table_key(
                    r.get::<&str, usize>(3).unwrap_or_default(),
                    r.get::<&str, usize>(4).unwrap_or_default(),
                ),
                columns: r.get::<&str, usize>(5).unwrap_or_default().to_string(),
                ref_columns: r.get::<&str, usize>(6).unwrap_or_default().to_string(),
            })
            .collect();
        Ok(())
    }
}

/// INFORMATION_SCHEMA reports nullability as 'YES'/'NO'.
fn nullable_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("YES")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_flag() {
        assert!(nullable_flag("YES"));
        assert!(nullable_flag("yes"));
        assert!(!nullable_flag("NO"));
        assert!(!nullable_flag(""));
    }
}
