use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::entity::{Row, Table};
use crate::domain::repository::remote::{RejectedSnafu, RemoteError};

/// In-memory rows of every remote table, kept in insertion order.
///
/// Rows are plain JSON objects. Every row has a string `id`, assigned on
/// insertion unless the row brings its own.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tables {
    rows: HashMap<Table, Vec<Row>>,
}

impl Tables {
    /// Rows of `table` owned by `user_id`, most recent first.
    pub fn fetch(&self, table: Table, user_id: &str) -> Vec<Row> {
        self.rows(table)
            .iter()
            .rev()
            .filter(|row| row.get("user_id").and_then(Value::as_str) == Some(user_id))
            .cloned()
            .collect()
    }

    /// Insert `row` and return it as stored.
    ///
    /// # Errors
    ///
    /// This function will return an error if a row with the same `id`
    /// already exists.
    pub fn insert(&mut self, table: Table, mut row: Row) -> Result<Row, RemoteError> {
        let id = match row.get("id").and_then(Value::as_str) {
            Some(id) => id.to_owned(),
            None => Uuid::new_v4().to_string(),
        };
        if self.position(table, &id).is_some() {
            return RejectedSnafu {
                message: format!("duplicate key value violates unique constraint \"{table}_pkey\""),
            }
            .fail();
        }
        row.insert("id".into(), Value::String(id));
        self.rows.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    /// Overwrite `columns` of the row identified by `id`. Missing rows are
    /// ignored.
    pub fn update(&mut self, table: Table, id: &str, columns: Row) {
        if let Some(index) = self.position(table, id) {
            if let Some(row) = self.rows.get_mut(&table).and_then(|rows| rows.get_mut(index)) {
                merge(row, columns);
            }
        }
    }

    /// Remove the row identified by `id`. Missing rows are ignored.
    pub fn delete(&mut self, table: Table, id: &str) {
        if let Some(rows) = self.rows.get_mut(&table) {
            rows.retain(|row| row.get("id").and_then(Value::as_str) != Some(id));
        }
    }

    /// Merge `row` into the row that equals it on every column of `key`, or
    /// insert it under a fresh `id`.
    pub fn upsert(&mut self, table: Table, key: &[String], mut row: Row) {
        let rows = self.rows.entry(table).or_default();
        let existing = rows
            .iter_mut()
            .find(|candidate| key.iter().all(|column| candidate.get(column) == row.get(column)));
        match existing {
            Some(existing) => {
                row.remove("id");
                merge(existing, row);
            }
            None => {
                if !row.contains_key("id") {
                    row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
                }
                rows.push(row);
            }
        }
    }

    /// Every row of `table` in insertion order.
    pub fn rows(&self, table: Table) -> &[Row] {
        self.rows.get(&table).map_or(&[], Vec::as_slice)
    }

    fn position(&self, table: Table, id: &str) -> Option<usize> {
        self.rows(table)
            .iter()
            .position(|row| row.get("id").and_then(Value::as_str) == Some(id))
    }
}

fn merge(row: &mut Row, columns: Row) {
    for (column, value) in columns {
        row.insert(column, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(row) => row,
            _ => unreachable!(),
        }
    }

    #[test]
    fn tables_insert_assigns_and_rejects_ids() {
        let mut tables = Tables::default();
        let stored = tables
            .insert(Table::Tasks, row(json!({ "user_id": "u", "name": "Read" })))
            .unwrap();
        assert!(stored["id"].as_str().is_some_and(|id| !id.is_empty()));

        tables
            .insert(Table::Tasks, row(json!({ "id": "a", "user_id": "u" })))
            .unwrap();
        let err = tables
            .insert(Table::Tasks, row(json!({ "id": "a", "user_id": "u" })))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(tables.rows(Table::Tasks).len(), 2);
    }

    #[test]
    fn tables_fetch_filters_owner_newest_first() {
        let mut tables = Tables::default();
        for (id, user) in [("1", "u"), ("2", "v"), ("3", "u")] {
            tables
                .insert(Table::Sessions, row(json!({ "id": id, "user_id": user })))
                .unwrap();
        }
        let ids: Vec<_> = tables
            .fetch(Table::Sessions, "u")
            .iter()
            .map(|row| row["id"].clone())
            .collect();
        assert_eq!(ids, [json!("3"), json!("1")]);
    }

    #[test]
    fn tables_update_and_delete() {
        let mut tables = Tables::default();
        tables
            .insert(Table::Tasks, row(json!({ "id": "a", "name": "Read" })))
            .unwrap();
        tables.update(Table::Tasks, "a", row(json!({ "name": "Write" })));
        tables.update(Table::Tasks, "missing", row(json!({ "name": "x" })));
        assert_eq!(tables.rows(Table::Tasks)[0]["name"], "Write");

        tables.delete(Table::Tasks, "a");
        assert!(tables.rows(Table::Tasks).is_empty());
    }

    #[test]
    fn tables_upsert_matches_natural_key() {
        let mut tables = Tables::default();
        let key: Vec<String> = ["user_id", "task_id", "date"].map(String::from).to_vec();
        let completion = |completed| {
            row(json!({ "user_id": "u", "task_id": "t", "date": "2024-05-01", "completed": completed }))
        };

        tables.upsert(Table::Completions, &key, completion(true));
        tables.upsert(Table::Completions, &key, completion(false));
        let rows = tables.rows(Table::Completions);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["completed"], false);
    }

    #[test]
    fn tables_serialize_by_table_name() {
        let mut tables = Tables::default();
        tables
            .insert(Table::Completions, row(json!({ "id": "c" })))
            .unwrap();
        let value = serde_json::to_value(&tables).unwrap();
        assert_eq!(value, json!({ "task_completions": [{ "id": "c" }] }));
        assert_eq!(serde_json::from_value::<Tables>(value).unwrap(), tables);
    }
}
