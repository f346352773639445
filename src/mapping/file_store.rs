//! File-backed mapping store with hot reload.
//!
//! The file holds every host record, either as a JSON array or as a TOML
//! document with a `[[hosts]]` array (chosen by the `.toml` extension). The
//! parsed table is swapped atomically on change; lookups never block on a
//! reload in progress.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::Deserialize;

use crate::mapping::{HostMapping, MappingStore, StoreError};

type HostTable = HashMap<String, HostMapping>;

#[derive(Deserialize)]
struct HostsDocument {
    #[serde(default)]
    hosts: Vec<HostMapping>,
}

/// Mapping store reading its table from a file on disk.
#[derive(Debug)]
pub struct FileMappingStore {
    path: PathBuf,
    table: Arc<ArcSwap<HostTable>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileMappingStore {
    /// Load the file once. No reload happens until [`watch`](Self::watch).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let table = load_table(&path)?;
        tracing::info!(path = ?path, hosts = table.len(), "Loaded mapping file");

        Ok(Self {
            path,
            table: Arc::new(ArcSwap::from_pointee(table)),
            watcher: Mutex::new(None),
        })
    }

    /// Start watching the file and reload the table whenever it changes.
    ///
    /// A reload that fails keeps the previous table.
    pub fn watch(self) -> Result<Self, StoreError> {
        let table = Arc::clone(&self.table);
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        match load_table(&path) {
                            Ok(new_table) => {
                                tracing::info!(
                                    path = ?path,
                                    hosts = new_table.len(),
                                    "Mapping file reloaded"
                                );
                                table.store(Arc::new(new_table));
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    "Failed to reload mapping file. Keeping current table."
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Mapping file watcher started");

        *self.watcher.lock() = Some(watcher);
        Ok(self)
    }

    /// Number of hosts in the live table.
    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_table(path: &Path) -> Result<HostTable, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mappings: Vec<HostMapping> = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str::<HostsDocument>(&content)
            .map_err(|e| StoreError::Decode(e.to_string()))?
            .hosts
    } else {
        serde_json::from_str(&content).map_err(|e| StoreError::Decode(e.to_string()))?
    };

    let mut table = HostTable::with_capacity(mappings.len());
    for mapping in mappings {
        if table.contains_key(&mapping.host) {
            tracing::warn!(
                host = %mapping.host,
                "Duplicate host in mapping file, last record wins"
            );
        }
        table.insert(mapping.host.clone(), mapping);
    }
    Ok(table)
}

#[async_trait]
impl MappingStore for FileMappingStore {
    async fn find(&self, host: &str) -> Result<Option<HostMapping>, StoreError> {
        Ok(self.table.load().get(host).cloned())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
