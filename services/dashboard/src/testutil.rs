//! Fakes and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use govdata::Millis;
use kvstore::{InMemoryStorage, Storage};
use serde_json::{json, Value};

use crate::aggregator::Aggregator;
use crate::cache::{CachePolicy, CacheStore};
use crate::provider::{DataFetcher, Endpoints, FetchError};
use crate::runtime::ManualClock;
use crate::state::SharedState;

pub const BASE: &str = "http://snapshots.test";

/// 2025-06-01T00:00:00Z
pub const MID_2025: Millis = 1_748_736_000_000;

pub fn endpoints() -> Endpoints {
    Endpoints::new(BASE)
}

/// Serves canned responses; unknown URLs fail like a refused connection.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Result<Value, u16>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
    panics: bool,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, url: String, body: Value) -> Self {
        self.set_ok(url, body);
        self
    }

    pub fn status(self, url: String, status: u16) -> Self {
        self.responses.lock().unwrap().insert(url, Err(status));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call panics after being recorded.
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn set_ok(&self, url: String, body: Value) {
        self.responses.lock().unwrap().insert(url, Ok(body));
    }

    pub fn clear(&self) {
        self.responses.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DataFetcher for FakeFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("fetcher panicked on {url}");
        }
        let canned = self.responses.lock().unwrap().get(url).cloned();
        match canned {
            Some(Ok(v)) => Ok(v),
            Some(Err(status)) => Err(FetchError::Http { status }),
            None => Err(FetchError::Transport("connection refused".into())),
        }
    }
}

pub fn vote_json(id: &str, vote: &str, block_time: &str) -> Value {
    json!({
        "proposalId": id,
        "proposalTxHash": format!("{id}-tx"),
        "proposalIndex": 0,
        "voteTxHash": format!("{id}-vote"),
        "blockTime": block_time,
        "vote": vote,
        "metaUrl": null,
        "metaHash": null,
        "proposalTitle": format!("Proposal {id}"),
        "proposalType": "InfoAction",
        "proposedEpoch": 500,
        "expirationEpoch": 506,
        "rationale": "Governance rationale"
    })
}

pub fn yearly_stats_json(year: i32, core: u64) -> Value {
    json!({
        "year": year,
        "yearlyTotals": {
            "core": core, "react": 1, "transaction": 2, "wallet": 3,
            "provider": 4, "coreCsl": 5, "coreCst": 6
        },
        "monthlyDownloads": [{ "month": "January", "downloads": core, "trend": "up" }],
        "peakMonth": { "name": "January", "downloads": core }
    })
}

pub fn current_stats_json() -> Value {
    json!({
        "github": { "core_in_package_json": 120, "core_in_any_file": 300 },
        "npm": {
            "downloads": { "last_day": 10, "last_week": 70, "last_month": 300, "last_year": 3600 },
            "react_package_downloads": 50,
            "transaction_package_downloads": 40,
            "wallet_package_downloads": 30,
            "provider_package_downloads": 20,
            "core_csl_package_downloads": 10,
            "core_cst_package_downloads": 5,
            "latest_version": "1.8.4",
            "dependents_count": 42
        }
    })
}

pub fn catalyst_json(statuses: &[&str]) -> Value {
    let projects: Vec<Value> = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| {
            json!({
                "projectDetails": {
                    "id": i,
                    "title": format!("Project {i}"),
                    "budget": 100000,
                    "milestones_qty": 4,
                    "funds_distributed": 50000,
                    "project_id": 1100000 + i,
                    "category": "F11: Developer Tools",
                    "status": status,
                    "finished": ""
                },
                "milestonesCompleted": 2
            })
        })
        .collect();
    json!({ "timestamp": "2025-05-30T12:00:00Z", "projects": projects })
}

/// A fetcher with every 2024/2025 shard and the catalyst file available.
pub fn full_fetcher() -> FakeFetcher {
    let e = endpoints();
    FakeFetcher::new()
        .ok(e.current_stats(), current_stats_json())
        .ok(e.yearly_stats(2024), yearly_stats_json(2024, 56420))
        .ok(e.yearly_stats(2025), yearly_stats_json(2025, 12000))
        .ok(
            e.yearly_votes(2024),
            json!([vote_json("a", "Yes", "2024-03-01T00:00:00Z")]),
        )
        .ok(
            e.yearly_votes(2025),
            json!([vote_json("b", "No", "2025-01-01T00:00:00Z")]),
        )
        .ok(e.catalyst(), catalyst_json(&["Completed", "In Progress"]))
}

pub struct Harness {
    pub fetcher: Arc<FakeFetcher>,
    pub storage: InMemoryStorage,
    pub clock: Arc<ManualClock>,
    pub aggregator: Aggregator,
}

pub async fn harness(fetcher: FakeFetcher, policy: CachePolicy) -> Harness {
    let storage = InMemoryStorage::new();
    let cache = CacheStore::probe(Arc::new(storage.clone()) as Arc<dyn Storage>).await;
    harness_with_cache(fetcher, policy, storage, cache)
}

pub fn harness_with_cache(
    fetcher: FakeFetcher,
    policy: CachePolicy,
    storage: InMemoryStorage,
    cache: CacheStore,
) -> Harness {
    let fetcher = Arc::new(fetcher);
    let clock = Arc::new(ManualClock::new(MID_2025));
    let aggregator = Aggregator::new(
        fetcher.clone(),
        endpoints(),
        cache,
        policy,
        clock.clone(),
        2024,
    );
    Harness {
        fetcher,
        storage,
        clock,
        aggregator,
    }
}

/// Serves the full router on an ephemeral port and returns its base URL.
pub async fn serve(state: SharedState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, crate::app(state)).await.unwrap();
    });
    format!("http://{addr}")
}
