use std::path::PathBuf;
use std::sync::Arc;

use onboard_ai::AiClient;
use onboard_core::config::Config;
use onboard_core::db::Db;
use onboard_core::storage::{FsObjectStore, ObjectStore};
use onboard_core::view::UiState;
use tokio::sync::{broadcast, RwLock};

use crate::error::AppError;
use crate::mailer::Mailer;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub db: Arc<Db>,
    pub store: Arc<dyn ObjectStore>,
    pub mailer: Mailer,
    pub ui: Arc<RwLock<UiState>>,
    pub event_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Load config from `root`, open the database and object store.
    pub fn open(root: PathBuf) -> anyhow::Result<Self> {
        let config = Config::load(&root)?;
        let db = Db::open(&config.database_path(&root))?;
        let store = FsObjectStore::new(
            config.objects_dir(&root),
            config.storage.public_base_url.clone(),
        );
        Ok(Self::from_parts(root, config, db, Arc::new(store)))
    }

    pub fn from_parts(
        root: PathBuf,
        config: Config,
        db: Db,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            root,
            mailer: Mailer::from_config(&config.mail),
            config: Arc::new(config),
            db: Arc::new(db),
            store,
            ui: Arc::new(RwLock::new(UiState::default())),
            event_tx,
        }
    }

    /// Tell SSE subscribers that something changed.
    pub fn notify(&self) {
        let _ = self.event_tx.send(());
    }

    /// Provider client from config; errors when no endpoint is set.
    pub fn ai(&self) -> onboard_ai::Result<AiClient> {
        AiClient::from_settings(
            self.config.ai.endpoint.as_deref(),
            &self.config.ai.model,
            self.config.ai.api_key(),
        )
    }

    /// Run a store operation on the blocking pool.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&Db, &dyn ObjectStore) -> onboard_core::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        let store = self.store.clone();
        let out = tokio::task::spawn_blocking(move || f(&db, store.as_ref()))
            .await
            .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
        Ok(out)
    }
}
