//! Worker lifecycle: install, activate, and the states between.
//!
//! Transitions are driven by host-delivered signals, never by the engine
//! itself. A new version is detected solely by a changed generation name
//! baked into the build; nothing here expires on its own.

use outpost_client::Fetch;
use outpost_core::{Error, GenerationStore, Request};
use serde::Serialize;

/// Where the worker is in its install → active progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Active,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InstallReport {
    /// Manifest entries committed to the new generation.
    pub entries: u64,
    /// The worker wants to activate immediately instead of waiting for
    /// existing clients to close.
    pub skip_waiting: bool,
}

/// Outcome of activation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActivationReport {
    /// Superseded generations removed.
    pub deleted_generations: u64,
    /// The worker takes control of already-open clients now rather than
    /// on their next navigation.
    pub claimed: bool,
}

/// Populate the current generation with every manifest asset.
///
/// All manifest URLs must resolve to complete 200 responses; the first
/// failure aborts the attempt before anything is written, and the batch
/// itself commits in one transaction. A previously active generation is
/// untouched either way.
pub async fn install(
    store: &GenerationStore,
    net: &dyn Fetch,
    generation: &str,
    manifest: &[String],
) -> Result<InstallReport, Error> {
    let mut entries = Vec::with_capacity(manifest.len());

    for url in manifest {
        let request = Request::get(url.clone());
        let response = net
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed { url: url.clone(), reason: e.to_string() })?;

        if !response.is_cacheable() {
            return Err(Error::InstallFailed {
                url: url.clone(),
                reason: format!("status {}", response.status.as_u16()),
            });
        }

        entries.push(response.snapshot(&request));
    }

    store.put_entries_atomic(generation, &entries).await?;

    tracing::info!(generation, entries = entries.len(), "installed cache generation");

    Ok(InstallReport { entries: entries.len() as u64, skip_waiting: true })
}

/// Delete every generation other than the current one and claim clients.
pub async fn activate(store: &GenerationStore, generation: &str) -> Result<ActivationReport, Error> {
    store.ensure_generation(generation).await?;
    let deleted = store.delete_generations_except(generation).await?;

    tracing::info!(generation, deleted, "activated cache generation");

    Ok(ActivationReport { deleted_generations: deleted, claimed: true })
}
