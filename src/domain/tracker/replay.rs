use enum_dispatch::enum_dispatch;
use serde_json::Value;
use snafu::prelude::*;

use crate::domain::entity::{ChangeKind, Row, Table};
use crate::domain::repository::{RemoteError, RemoteStore};

#[enum_dispatch]
pub(crate) trait ApplyChange {
    /// Send the change to `remote`. Inserts return the row as persisted.
    async fn apply(self, table: Table, remote: &dyn RemoteStore) -> Result<Option<Row>, RemoteError>;
}

/// A mutation decoded from its queued form and ready to be sent.
#[enum_dispatch(ApplyChange)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ChangeOp {
    Insert(InsertOp),
    Update(UpdateOp),
    Delete(DeleteOp),
    Upsert(UpsertOp),
}

impl ChangeOp {
    /// Decode the payload of a change of `kind` against `table`.
    pub(crate) fn parse(table: Table, kind: ChangeKind, mut data: Row) -> Result<Self, MalformedChange> {
        let op = match kind {
            ChangeKind::Insert => Self::Insert(InsertOp { row: data }),
            ChangeKind::Update => {
                let id = take_id(&mut data).context(MissingIdSnafu { table, kind })?;
                Self::Update(UpdateOp { id, columns: data })
            }
            ChangeKind::Delete => {
                let id = take_id(&mut data).context(MissingIdSnafu { table, kind })?;
                Self::Delete(DeleteOp { id })
            }
            ChangeKind::Upsert => {
                let key = table.natural_key();
                if let Some(column) = key.iter().find(|column| !data.contains_key(**column)) {
                    return MissingKeySnafu { table, column: *column }.fail();
                }
                Self::Upsert(UpsertOp {
                    key: key.iter().map(|column| (*column).to_owned()).collect(),
                    row: data,
                })
            }
        };
        Ok(op)
    }
}

fn take_id(data: &mut Row) -> Option<String> {
    match data.remove("id")? {
        Value::String(id) => Some(id),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InsertOp {
    row: Row,
}

impl ApplyChange for InsertOp {
    async fn apply(self, table: Table, remote: &dyn RemoteStore) -> Result<Option<Row>, RemoteError> {
        remote.insert(table, self.row).await.map(Some)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UpdateOp {
    id: String,
    columns: Row,
}

impl ApplyChange for UpdateOp {
    async fn apply(self, table: Table, remote: &dyn RemoteStore) -> Result<Option<Row>, RemoteError> {
        remote.update(table, self.id, self.columns).await?;
        Ok(None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DeleteOp {
    id: String,
}

impl ApplyChange for DeleteOp {
    async fn apply(self, table: Table, remote: &dyn RemoteStore) -> Result<Option<Row>, RemoteError> {
        remote.delete(table, self.id).await?;
        Ok(None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UpsertOp {
    key: Vec<String>,
    row: Row,
}

impl ApplyChange for UpsertOp {
    async fn apply(self, table: Table, remote: &dyn RemoteStore) -> Result<Option<Row>, RemoteError> {
        remote.upsert(table, self.key, self.row).await?;
        Ok(None)
    }
}

/// A queued change whose payload can not be sent.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum MalformedChange {
    #[snafu(display("{kind} on {table} carries no row id"))]
    #[non_exhaustive]
    MissingId { table: Table, kind: ChangeKind },
    #[snafu(display("Upsert on {table} is missing key column {column}"))]
    #[non_exhaustive]
    MissingKey { table: Table, column: &'static str },
}
