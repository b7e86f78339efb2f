use std::collections::HashMap;
use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::access::Capabilities;
use crate::config::Config;
use crate::notify::Notifier;
use crate::records::EntityKind;
use crate::table::Table;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A table a screen has open, with the rows it was last given.
pub struct OpenTable {
    pub table: Table<serde_json::Value>,
    pub rows: Vec<serde_json::Value>,
    /// Set when the rows came from the record store.
    pub entity: Option<EntityKind>,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Capabilities>,
    pub tables: HashMap<String, OpenTable>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            db: None,
            session: None,
            tables: HashMap::new(),
            notifier: Notifier::new(),
        }
    }
}
