use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use govdata::{CatalystSnapshot, MeshData};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{error, info, warn};

use crate::aggregator::{AggregateError, Aggregator};
use crate::runtime::LoadPhase;

pub const MESH_FETCH_ERROR: &str = "Failed to fetch mesh data";
pub const LOAD_ERROR: &str = "Failed to load data";

pub type SharedState = Arc<DataContext>;

/// What every consumer of the dashboard data reads.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSnapshot {
    pub mesh_data: Option<Arc<MeshData>>,
    pub catalyst_data: Option<Arc<CatalystSnapshot>>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub phase: LoadPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefetchOutcome {
    Completed,
    Started,
    AlreadyInFlight,
}

/// Single owner of the loaded datasets and their loading/error flags.
pub struct DataContext {
    aggregator: Aggregator,
    state: RwLock<DataSnapshot>,
    // held for the whole of a load or refetch
    in_flight: Arc<Mutex<()>>,
    loaded: AtomicBool,
}

impl DataContext {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator,
            state: RwLock::new(DataSnapshot::default()),
            in_flight: Arc::new(Mutex::new(())),
            loaded: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> DataSnapshot {
        self.state.read().await.clone()
    }

    /// Initial load. Uses fresh cache entries where allowed and fetches the
    /// rest. Runs at most once per context.
    pub async fn load_data(&self) {
        if self.loaded.swap(true, Ordering::SeqCst) {
            warn!("initial load already ran, ignoring");
            return;
        }

        let _guard = self.in_flight.lock().await;
        self.begin().await;

        let outcome = AssertUnwindSafe(self.load_inner()).catch_unwind().await;
        if outcome.is_err() {
            error!("initial load aborted");
            self.state.write().await.error = Some(LOAD_ERROR.to_string());
        }

        self.finish().await;
    }

    async fn load_inner(&self) {
        if self.aggregator.must_fetch() {
            if self.aggregator.cache_available() {
                info!("cache disabled, fetching fresh mesh and catalyst data");
            } else {
                info!("cache store not available, fetching fresh data");
            }
            self.fetch_both().await;
            return;
        }

        info!("cache enabled, checking cached entries");
        let (mesh, catalyst) =
            tokio::join!(self.aggregator.cached_mesh(), self.aggregator.cached_catalyst());
        let need_mesh = mesh.is_none();
        let need_catalyst = catalyst.is_none();

        {
            let mut st = self.state.write().await;
            if let Some(m) = mesh {
                st.mesh_data = Some(Arc::new(m));
            }
            if let Some(c) = catalyst {
                st.catalyst_data = Some(Arc::new(c));
            }
        }

        let mesh = async {
            if need_mesh {
                Some(self.aggregator.refresh_mesh().await)
            } else {
                None
            }
        };
        let catalyst = async {
            if need_catalyst {
                Some(self.aggregator.refresh_catalyst().await)
            } else {
                None
            }
        };
        let (mesh, catalyst) = tokio::join!(mesh, catalyst);

        if let Some(res) = mesh {
            self.apply_mesh(res).await;
        }
        if let Some(res) = catalyst {
            self.apply_catalyst(res).await;
        }
    }

    /// Fetches both datasets regardless of cache freshness and waits for the
    /// result. Returns immediately if another load or refetch is running.
    pub async fn refetch_data(&self) -> RefetchOutcome {
        let Ok(guard) = self.in_flight.clone().try_lock_owned() else {
            info!("refetch already in flight, ignoring");
            return RefetchOutcome::AlreadyInFlight;
        };
        self.run_refetch(guard).await;
        RefetchOutcome::Completed
    }

    /// Like [`DataContext::refetch_data`] but runs in the background.
    pub fn spawn_refetch(self: &Arc<Self>) -> RefetchOutcome {
        let Ok(guard) = self.in_flight.clone().try_lock_owned() else {
            info!("refetch already in flight, ignoring");
            return RefetchOutcome::AlreadyInFlight;
        };
        let ctx = Arc::clone(self);
        tokio::spawn(async move {
            ctx.run_refetch(guard).await;
        });
        RefetchOutcome::Started
    }

    async fn run_refetch(&self, _guard: OwnedMutexGuard<()>) {
        info!("manual refetch requested");
        self.begin().await;
        self.fetch_both().await;
        self.finish().await;
    }

    async fn fetch_both(&self) {
        let (mesh, catalyst) = tokio::join!(
            self.aggregator.refresh_mesh(),
            self.aggregator.refresh_catalyst()
        );
        self.apply_mesh(mesh).await;
        self.apply_catalyst(catalyst).await;
    }

    async fn apply_mesh(&self, res: Result<MeshData, AggregateError>) {
        let mut st = self.state.write().await;
        match res {
            Ok(data) => {
                st.mesh_data = Some(Arc::new(data));
            }
            Err(e) => {
                // previous mesh data stays visible
                error!(error = %e, "mesh data fetch failed");
                st.error = Some(MESH_FETCH_ERROR.to_string());
            }
        }
    }

    async fn apply_catalyst(&self, res: Result<CatalystSnapshot, AggregateError>) {
        let mut st = self.state.write().await;
        match res {
            Ok(data) => {
                st.catalyst_data = Some(Arc::new(data));
            }
            Err(e) => {
                warn!(error = %e, "catalyst data fetch failed");
                st.catalyst_data = None;
            }
        }
    }

    async fn begin(&self) {
        let started_at = self.aggregator.now_millis();
        let mut st = self.state.write().await;
        st.is_loading = true;
        st.error = None;
        st.phase = LoadPhase::Loading { started_at };
    }

    async fn finish(&self) {
        let now = self.aggregator.now_millis();
        let mut st = self.state.write().await;
        st.is_loading = false;
        let phase = match &st.error {
            Some(e) => LoadPhase::Failed {
                error: e.clone(),
                failed_at: now,
            },
            None => LoadPhase::Ready { loaded_at: now },
        };
        st.phase = phase;
        info!(
            has_mesh = st.mesh_data.is_some(),
            has_catalyst = st.catalyst_data.is_some(),
            error = ?st.error,
            "data load finished"
        );
    }

    #[cfg(test)]
    async fn wait_idle(&self) {
        drop(self.in_flight.lock().await);
    }
}
