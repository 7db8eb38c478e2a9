pub mod client;
pub mod config;
pub mod deliverable;
pub mod doc;
pub mod init;
pub mod risk;
pub mod serve;
pub mod signature;
pub mod stats;
pub mod step;

use std::path::Path;

use anyhow::Context;
use onboard_core::client::Client;
use onboard_core::config::Config;
use onboard_core::db::Db;
use onboard_core::storage::FsObjectStore;
use uuid::Uuid;

/// An initialized project opened for one command.
pub struct Project {
    pub config: Config,
    pub db: Db,
    pub store: FsObjectStore,
}

impl Project {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let config = Config::load(root).context("failed to load config")?;
        let db = Db::open(&config.database_path(root)).context("failed to open database")?;
        let store = FsObjectStore::new(
            config.objects_dir(root),
            config.storage.public_base_url.clone(),
        );
        Ok(Self { config, db, store })
    }
}

/// Look a client up by id, or by exact name.
pub fn resolve_client(db: &Db, key: &str) -> anyhow::Result<Client> {
    if let Ok(id) = key.parse::<Uuid>() {
        return Ok(Client::get(db, id)?);
    }
    Client::find_by_name(db, key)?.ok_or_else(|| anyhow::anyhow!("no client named '{key}'"))
}

pub fn parse_id(s: &str) -> anyhow::Result<Uuid> {
    s.parse().with_context(|| format!("'{s}' is not a valid id"))
}
