//! Dependency ordering for destructive table clearing.

use super::ForeignKeyInfo;
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

/// Compute a safe order for clearing table data: every referencing (child)
/// table appears before the tables it references, so deletes never trip a
/// foreign key.
///
/// Builds a directed graph from the foreign key descriptors and runs a
/// topological sort. If the graph has a cycle, falls back to the naive
/// reversal of the input order.
pub fn clear_order(tables: &[String], foreign_keys: &[ForeignKeyInfo]) -> Vec<String> {
    // in_degree[t] counts children referencing t; a table with no children
    // can be cleared immediately.
    let mut in_degree: BTreeMap<&str, usize> = tables.iter().map(|t| (t.as_str(), 0)).collect();
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for fk in foreign_keys {
        let child = fk.table.as_str();
        let parent = fk.ref_table.as_str();
        if child == parent {
            // Self-references do not constrain ordering across tables.
            continue;
        }
        if !in_degree.contains_key(child) || !in_degree.contains_key(parent) {
            continue;
        }
        children.entry(child).or_default().push(parent);
        *in_degree.get_mut(parent).unwrap() += 1;
    }

    let mut queue: VecDeque<&str> = tables
        .iter()
        .map(String::as_str)
        .filter(|t| in_degree[t] == 0)
        .collect();

    let mut ordered = Vec::with_capacity(tables.len());
    while let Some(table) = queue.pop_front() {
        ordered.push(table.to_string());
        for &parent in children.get(table).into_iter().flatten() {
            let degree = in_degree.get_mut(parent).unwrap();
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(parent);
            }
        }
    }

    if ordered.len() != tables.len() {
        warn!(
            "Foreign key graph has a cycle; clearing tables in reverse insertion order"
        );
        return tables.iter().rev().cloned().collect();
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(name: &str, child: &str, parent: &str) -> ForeignKeyInfo {
        ForeignKeyInfo {
            name: name.into(),
            table: child.into(),
            columns: "id".into(),
            ref_table: parent.into(),
            ref_columns: "id".into(),
        }
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|t| t == name).unwrap()
    }

    #[test]
    fn test_children_cleared_before_parents() {
        let tables = keys(&["[dbo].customers", "[dbo].orders", "[dbo].order_lines"]);
        let fks = vec![
            fk("fk_orders_customers", "[dbo].orders", "[dbo].customers"),
            fk("fk_lines_orders", "[dbo].order_lines", "[dbo].orders"),
        ];
        let order = clear_order(&tables, &fks);
        assert_eq!(order.len(), 3);
        assert!(position(&order, "[dbo].order_lines") < position(&order, "[dbo].orders"));
        assert!(position(&order, "[dbo].orders") < position(&order, "[dbo].customers"));
    }

    #[test]
    fn test_no_foreign_keys_preserves_all_tables() {
        let tables = keys(&["[dbo].a", "[dbo].b"]);
        let order = clear_order(&tables, &[]);
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_cycle_falls_back_to_reversal() {
        let tables = keys(&["[dbo].a", "[dbo].b"]);
        let fks = vec![
            fk("fk_a_b", "[dbo].a", "[dbo].b"),
            fk("fk_b_a", "[dbo].b", "[dbo].a"),
        ];
        let order = clear_order(&tables, &fks);
        assert_eq!(order, keys(&["[dbo].b", "[dbo].a"]));
    }

    #[test]
    fn test_self_reference_ignored() {
        let tables = keys(&["[dbo].employees"]);
        let fks = vec![fk("fk_manager", "[dbo].employees", "[dbo].employees")];
        let order = clear_order(&tables, &fks);
        assert_eq!(order, tables);
    }

    #[test]
    fn test_foreign_key_to_unknown_table_ignored() {
        let tables = keys(&["[dbo].orders"]);
        let fks = vec![fk("fk_other_db", "[dbo].orders", "[dbo].missing")];
        let order = clear_order(&tables, &fks);
        assert_eq!(order, tables);
    }
}
