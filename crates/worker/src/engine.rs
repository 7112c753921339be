//! The engine: classification, strategy dispatch, and lifecycle state.
//!
//! One engine lives for the worker's lifetime. It owns the generation
//! store handle, the network seam, and the set of background revalidation
//! tasks that must finish before the worker may be torn down.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;

use outpost_client::Fetch;
use outpost_core::config::ConfigError;
use outpost_core::{AppConfig, Error, GenerationStore, Request, StoredResponse};

use crate::classify::{RequestClass, classify};
use crate::lifecycle::{self, ActivationReport, InstallReport, WorkerState};
use crate::quota::QuotaGuard;
use crate::strategies;

/// Resolved, immutable engine configuration.
///
/// Built once at boot from [`AppConfig`]; fallback and manifest paths are
/// already absolute here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name of the current cache generation.
    pub generation: String,
    /// Path prefix that marks API calls.
    pub api_prefix: String,
    /// Absolute URL of the shell root document.
    pub shell_url: String,
    /// Absolute URL of the offline fallback document.
    pub offline_url: String,
    /// Absolute manifest URLs, install order.
    pub manifest: Vec<String>,
    pub quota: QuotaGuard,
}

impl EngineConfig {
    /// Resolve an [`AppConfig`] into engine configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a manifest or fallback path cannot be
    /// resolved against the configured origin.
    pub fn from_app(config: &AppConfig) -> Result<Self, ConfigError> {
        let manifest = config
            .manifest
            .iter()
            .map(|entry| config.resolve(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            generation: config.cache_name.clone(),
            api_prefix: config.api_prefix.clone(),
            shell_url: config.resolve(&config.shell_url)?,
            offline_url: config.resolve(&config.offline_url)?,
            manifest,
            quota: QuotaGuard::new(config.quota_limit_bytes, config.quota_trigger_ratio),
        })
    }
}

/// Which strategy produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    Navigation,
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl ServedBy {
    pub fn label(self) -> &'static str {
        match self {
            ServedBy::Navigation => "navigation",
            ServedBy::CacheFirst => "cache-first",
            ServedBy::NetworkFirst => "network-first",
            ServedBy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

/// A response plus the strategy that produced it.
#[derive(Debug)]
pub struct Served {
    pub response: StoredResponse,
    pub source: ServedBy,
}

/// The request-interception engine.
pub struct Engine {
    store: GenerationStore,
    net: Arc<dyn Fetch>,
    config: Arc<EngineConfig>,
    state: Mutex<WorkerState>,
    revalidations: tokio::sync::Mutex<JoinSet<()>>,
}

impl Engine {
    pub fn new(store: GenerationStore, net: Arc<dyn Fetch>, config: EngineConfig) -> Self {
        Self {
            store,
            net,
            config: Arc::new(config),
            state: Mutex::new(WorkerState::Installing),
            revalidations: tokio::sync::Mutex::new(JoinSet::new()),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: WorkerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Host delivered the install signal.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.set_state(WorkerState::Installing);
        let report =
            lifecycle::install(&self.store, self.net.as_ref(), &self.config.generation, &self.config.manifest).await?;
        self.set_state(WorkerState::Installed);
        Ok(report)
    }

    /// Host delivered the activate signal.
    pub async fn on_activate(&self) -> Result<ActivationReport, Error> {
        self.set_state(WorkerState::Activating);
        let report = lifecycle::activate(&self.store, &self.config.generation).await?;
        self.set_state(WorkerState::Active);
        Ok(report)
    }

    /// Host delivered a fetch event.
    ///
    /// Returns `None` for requests the engine does not intercept; the host
    /// applies its default handling and no entry is ever created for them.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Option<Served>, Error> {
        match classify(request, &self.config.api_prefix) {
            RequestClass::Bypass => {
                tracing::debug!(method = %request.method, url = %request.url, "request left to default handling");
                Ok(None)
            }
            RequestClass::Navigation => {
                let response = strategies::navigation::navigation(&self.store, self.net.as_ref(), &self.config, request).await?;
                Ok(Some(Served { response, source: ServedBy::Navigation }))
            }
            RequestClass::StaticAsset => {
                let response = strategies::cache_first::cache_first(&self.store, self.net.as_ref(), &self.config, request).await?;
                Ok(Some(Served { response, source: ServedBy::CacheFirst }))
            }
            RequestClass::Api => {
                let response = strategies::network_first::network_first(&self.store, self.net.as_ref(), &self.config, request).await?;
                Ok(Some(Served { response, source: ServedBy::NetworkFirst }))
            }
            RequestClass::Other => {
                let response = strategies::stale_while_revalidate::stale_while_revalidate(
                    &self.store,
                    &self.net,
                    &self.config,
                    &self.revalidations,
                    request,
                )
                .await?;
                Ok(Some(Served { response, source: ServedBy::StaleWhileRevalidate }))
            }
        }
    }

    /// Wait for every background revalidation to settle.
    ///
    /// The serve loop calls this before teardown so in-flight cache writes
    /// are not dropped with the worker.
    pub async fn drain_background(&self) {
        let mut revalidations = self.revalidations.lock().await;
        while revalidations.join_next().await.is_some() {}
    }
}
