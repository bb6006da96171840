use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::{CartConfig, CartError};
use crate::services::engine::{CartContext, CartEngine};
use crate::services::notifications::CartEventReceiver;
use crate::services::remote::{RestSchedulingApi, SchedulingApi};
use crate::services::repository::ItemRepository;
use crate::services::slots::{Clock, SystemClock};
use crate::services::store::{FileStore, InMemoryStore, KeyValueStore, RedisStore};

pub type SharedEngine = Arc<Mutex<CartEngine>>;

/// Lazily created cart engines, one per subject, sharing a single set of collaborators.
pub struct CartHub {
    context: CartContext,
    engines: RwLock<HashMap<String, SharedEngine>>,
}

impl CartHub {
    pub fn new(context: CartContext) -> Self {
        Self {
            context,
            engines: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_parts(
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn SchedulingApi>,
        clock: Arc<dyn Clock>,
        config: &CartConfig,
    ) -> Self {
        Self::new(CartContext::new(ItemRepository::new(store), api, clock, config))
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, CartError> {
        let api: Arc<dyn SchedulingApi> = Arc::new(RestSchedulingApi::new(config)?);
        let store = select_store(config).await;

        Ok(Self::with_parts(
            store,
            api,
            Arc::new(SystemClock),
            &CartConfig::from_app_config(config),
        ))
    }

    pub fn context(&self) -> &CartContext {
        &self.context
    }

    pub fn subscribe(&self) -> CartEventReceiver {
        self.context.notifications.subscribe()
    }

    pub async fn engine(&self, subject_id: &str) -> SharedEngine {
        if let Some(engine) = self.engines.read().await.get(subject_id) {
            return engine.clone();
        }

        // Load outside the map lock; if another request won the race its engine is kept.
        let loaded = Arc::new(Mutex::new(CartEngine::load(subject_id, self.context.clone()).await));
        self.engines
            .write()
            .await
            .entry(subject_id.to_string())
            .or_insert(loaded)
            .clone()
    }

    /// Drops the subject's engine when its cart is empty, no dialog is open and no
    /// request is holding it. The persisted cart is untouched; the next request reloads it.
    pub async fn release_if_idle(&self, subject_id: &str) -> bool {
        let mut engines = self.engines.write().await;
        let idle = match engines.get(subject_id) {
            Some(engine) if Arc::strong_count(engine) == 1 => {
                engine.try_lock().map(|engine| engine.is_idle()).unwrap_or(false)
            }
            _ => false,
        };

        if idle {
            engines.remove(subject_id);
            debug!("Released idle cart engine for subject {}", subject_id);
        }
        idle
    }

    pub async fn loaded_subjects(&self) -> usize {
        self.engines.read().await.len()
    }
}

async fn select_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    if let Some(url) = &config.redis_url {
        match RedisStore::new(url).await {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("Redis cart store unavailable, falling back: {}", e),
        }
    }

    if let Some(dir) = &config.cart_storage_dir {
        match FileStore::new(dir.clone()) {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("File cart store at {:?} unavailable, falling back: {}", dir, e),
        }
    }

    info!("Using in-memory cart store");
    Arc::new(InMemoryStore::new())
}
