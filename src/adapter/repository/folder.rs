use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::prelude::*;
use tokio::sync::Mutex;

use crate::adapter::repository::tables::Tables;
use crate::domain::entity::{Row, Table};
use crate::domain::repository::remote::{RemoteError, UnreachableSnafu};
use crate::domain::repository::RemoteStore;

const TABLES_FILE: &str = "tables.json";

/// A [`RemoteStore`] kept as a JSON document in a shared folder, such as a
/// mounted network drive. The store is unreachable while the folder is
/// missing.
pub struct FolderRemote {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FolderRemote {
    /// Creates a new [`FolderRemote`] on `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Returns `true` if the folder can currently be reached.
    pub async fn is_reachable(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .is_ok_and(|metadata| metadata.is_dir())
    }

    async fn load(&self) -> Result<Tables, RemoteError> {
        ensure!(
            self.is_reachable().await,
            UnreachableSnafu {
                endpoint: self.root.display().to_string()
            }
        );
        let path = self.root.join(TABLES_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_whatever_context(|_| format!("Could not parse {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Tables::default()),
            Err(err) => {
                Err(err).with_whatever_context(|_| format!("Could not read {}", path.display()))
            }
        }
    }

    async fn save(&self, tables: &Tables) -> Result<(), RemoteError> {
        let path = self.root.join(TABLES_FILE);
        let temporary = path.with_extension("json.tmp");
        let content = serde_json::to_string(tables).whatever_context("Could not encode tables")?;
        tokio::fs::write(&temporary, content)
            .await
            .with_whatever_context(|_| format!("Could not write {}", temporary.display()))?;
        tokio::fs::rename(&temporary, &path)
            .await
            .with_whatever_context(|_| format!("Could not replace {}", path.display()))?;
        Ok(())
    }

    /// Load the tables, let `f` change them and write them back.
    async fn modify<T: Send>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, RemoteError> + Send,
    ) -> Result<T, RemoteError> {
        let _guard = self.lock.lock().await;
        let mut tables = self.load().await?;
        let value = f(&mut tables)?;
        self.save(&tables).await?;
        Ok(value)
    }
}

#[async_trait::async_trait]
impl RemoteStore for FolderRemote {
    async fn fetch(&self, table: Table, user_id: String) -> Result<Vec<Row>, RemoteError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.fetch(table, &user_id))
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, RemoteError> {
        self.modify(|tables| tables.insert(table, row)).await
    }

    async fn update(&self, table: Table, id: String, columns: Row) -> Result<(), RemoteError> {
        self.modify(|tables| {
            tables.update(table, &id, columns);
            Ok(())
        })
        .await
    }

    async fn delete(&self, table: Table, id: String) -> Result<(), RemoteError> {
        self.modify(|tables| {
            tables.delete(table, &id);
            Ok(())
        })
        .await
    }

    async fn upsert(&self, table: Table, key: Vec<String>, row: Row) -> Result<(), RemoteError> {
        self.modify(|tables| {
            tables.upsert(table, &key, row);
            Ok(())
        })
        .await
    }
}
