use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use storage::repository::SessionStore;

use crate::Clock;
use crate::bank_source::BankSource;
use crate::config::load_test_config;
use crate::error::{BootstrapError, EngineError};
use crate::guest::GuestId;
use crate::sessions::{BankUpdate, DeadlineTicker, SessionEngine, SharedEngine, TickerHandle};

/// Assembles the engine and its collaborators for a host application.
#[derive(Clone)]
pub struct AppServices {
    store: SessionStore,
    clock: Clock,
    guest_id: GuestId,
    engine: SharedEngine,
    bank_source: Option<Arc<dyn BankSource>>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError` if storage initialization or engine creation fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        bank_source: Option<Arc<dyn BankSource>>,
    ) -> Result<Self, BootstrapError> {
        let store = SessionStore::sqlite(db_url).await?;
        Self::from_store(store, clock, bank_source).await
    }

    /// Build services over an existing store.
    ///
    /// The bank source, if any, is fetched once; an unavailable source falls
    /// back to the bank already in storage.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError` on storage failures.
    pub async fn from_store(
        store: SessionStore,
        clock: Clock,
        bank_source: Option<Arc<dyn BankSource>>,
    ) -> Result<Self, BootstrapError> {
        let guest_id = GuestId::load_or_create(&store).await?;
        let engine = build_engine(&store, clock).await?;

        let services = Self {
            store,
            clock,
            guest_id,
            engine: Arc::new(Mutex::new(engine)),
            bank_source,
        };
        services.refresh_bank().await?;
        Ok(services)
    }

    #[must_use]
    pub fn engine(&self) -> SharedEngine {
        Arc::clone(&self.engine)
    }

    #[must_use]
    pub fn guest_id(&self) -> &GuestId {
        &self.guest_id
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Re-fetch the bank source and apply it under the engine lock.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` on storage failures.
    pub async fn refresh_bank(&self) -> Result<BankUpdate, EngineError> {
        let Some(source) = &self.bank_source else {
            return Ok(BankUpdate::Kept);
        };
        self.engine.lock().await.refresh_bank(source.as_ref()).await
    }

    /// Drop the in-memory engine and rebuild it from storage, as a page reload would.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError` on storage failures.
    pub async fn reload(&self) -> Result<(), BootstrapError> {
        let mut guard = self.engine.lock().await;
        let rebuilt = build_engine(&self.store, self.clock).await?;
        std::mem::replace(&mut *guard, rebuilt).dispose();
        info!(state = guard.state().label(), "engine reloaded from storage");
        Ok(())
    }

    /// Spawn a deadline ticker for the shared engine.
    #[must_use]
    pub fn spawn_ticker(&self, period: Duration) -> TickerHandle {
        DeadlineTicker::spawn(self.engine(), period)
    }
}

async fn build_engine(store: &SessionStore, clock: Clock) -> Result<SessionEngine, BootstrapError> {
    let config = load_test_config(store).await?;
    Ok(SessionEngine::create(config, store.clone(), clock).await?)
}
