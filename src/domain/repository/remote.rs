use std::error::Error as StdError;

use snafu::prelude::*;

use crate::domain::entity::{Row, Table};

/// An abstract interface for the hosted relational store.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetch all rows of `table` owned by `user_id`, most recent first.
    ///
    /// # Errors
    ///
    /// This function will return an error if the store is unreachable or
    /// rejects the query.
    async fn fetch(&self, table: Table, user_id: String) -> Result<Vec<Row>, RemoteError>;

    /// Insert one row and return it as persisted, including the identifier
    /// assigned by the store.
    ///
    /// # Errors
    ///
    /// This function will return an error if the store is unreachable or
    /// rejects the row.
    async fn insert(&self, table: Table, row: Row) -> Result<Row, RemoteError>;

    /// Update the given columns of the row identified by `id`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the store is unreachable or
    /// rejects the update.
    async fn update(&self, table: Table, id: String, columns: Row) -> Result<(), RemoteError>;

    /// Delete the row identified by `id`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the store is unreachable or
    /// rejects the deletion.
    async fn delete(&self, table: Table, id: String) -> Result<(), RemoteError>;

    /// Insert `row`, or update the existing row that matches it on every
    /// column of `key`, in one operation.
    ///
    /// # Errors
    ///
    /// This function will return an error if the store is unreachable or
    /// rejects the row.
    async fn upsert(&self, table: Table, key: Vec<String>, row: Row) -> Result<(), RemoteError>;
}

/// An error type of talking to a [`RemoteStore`].
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub))]
pub enum RemoteError {
    #[snafu(display("Remote store {endpoint} is unreachable"))]
    #[non_exhaustive]
    Unreachable { endpoint: String },
    #[snafu(display("Remote store rejected the request: {message}"))]
    #[non_exhaustive]
    Rejected { message: String },
    #[snafu(whatever, display("Remote request failed: {message}"))]
    #[non_exhaustive]
    Unknown {
        message: String,
        #[snafu(source(from(Box<dyn StdError + Send + Sync>, Some)))]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl RemoteError {
    /// Returns `true` if the store refused the row because it already exists,
    /// which means an earlier attempt went through.
    pub fn is_duplicate(&self) -> bool {
        match self {
            Self::Rejected { message } => message.contains("duplicate"),
            Self::Unknown { message, source } => {
                message.contains("duplicate")
                    || source
                        .as_ref()
                        .is_some_and(|source| source.to_string().contains("duplicate"))
            }
            Self::Unreachable { .. } => false,
        }
    }
}
