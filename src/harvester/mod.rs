//! The harvest run: snapshot in, three crawl stages, snapshot out

mod fetcher;
mod orchestrator;
mod shutdown;

pub use fetcher::{build_http_client, fetch_page};
pub use orchestrator::{HarvestReport, Orchestrator, StageReport};
pub use shutdown::{ShutdownCoordinator, ShutdownHandle};

use crate::config::Config;
use crate::filter::ContestFilter;
use crate::store::Store;
use crate::Result;
use std::sync::{Arc, Mutex};

/// Runs one full harvest: restore the snapshot, crawl everything the
/// filter accepts, and write the snapshot back.
///
/// The snapshot is written exactly once, whether the run completed, was
/// interrupted by a signal, or failed partway. Signal handling is armed
/// only for the duration of this call.
pub async fn harvest(config: &Config, filter: &dyn ContestFilter) -> Result<HarvestReport> {
    let store = Store::from_cache(config.cache.snapshot_path())?;
    if let Some(path) = config.cache.snapshot_path() {
        if store.is_empty() {
            tracing::info!("no snapshot at {}, starting empty", path.display());
        } else {
            tracing::info!("restored snapshot from {}", path.display());
        }
    } else {
        tracing::warn!("cache.snapshot-path is unset, nothing will be persisted");
    }

    let store = Arc::new(Mutex::new(store));
    let coordinator = ShutdownCoordinator::arm();
    let orchestrator = Orchestrator::new(config, Arc::clone(&store), coordinator.handle())?;

    let outcome = orchestrator.run(filter).await;

    // The single snapshot write of the run, on every exit path
    let snapshot = store.lock().unwrap().to_cache(config.cache.snapshot_path());
    if let Err(err) = &snapshot {
        tracing::error!("snapshot write failed: {err}");
    }
    drop(coordinator);

    let report = outcome?;
    snapshot?;
    Ok(report)
}
