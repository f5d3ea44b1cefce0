//! Fetches remote shards and assembles the mesh and catalyst aggregates.
//!
//! Each shard is fetched independently and a failed shard is dropped rather
//! than failing its siblings. The aggregator is the only writer of the
//! durable cache.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use govdata::{CatalystData, CatalystSnapshot, CurrentStats, MeshData, VoteRecord, YearlyStats};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{CacheEntry, CachePolicy, CacheStore, CATALYST_STORAGE_KEY, MESH_STORAGE_KEY};
use crate::provider::{fetch_typed, DataFetcher, Endpoints, FetchError};
use crate::runtime::Clock;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("No mesh data available")]
    NoDataAvailable,

    #[error("catalyst fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

pub struct Aggregator {
    fetcher: Arc<dyn DataFetcher>,
    endpoints: Endpoints,
    cache: CacheStore,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    start_year: i32,
}

impl Aggregator {
    pub fn new(
        fetcher: Arc<dyn DataFetcher>,
        endpoints: Endpoints,
        cache: CacheStore,
        policy: CachePolicy,
        clock: Arc<dyn Clock>,
        start_year: i32,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            cache,
            policy,
            clock,
            start_year,
        }
    }

    /// True when the cache cannot be trusted at all and every load must fetch.
    pub fn must_fetch(&self) -> bool {
        !self.policy.is_enabled() || !self.cache.is_available()
    }

    pub fn now_millis(&self) -> govdata::Millis {
        self.clock.now_millis()
    }

    pub fn cache_available(&self) -> bool {
        self.cache.is_available()
    }

    /// `start_year ..= current year`; empty if the start year lies in the future.
    pub fn years(&self) -> Vec<i32> {
        (self.start_year..=self.clock.current_year()).collect()
    }

    pub async fn fetch_mesh_data(&self) -> Result<MeshData, AggregateError> {
        let years = self.years();
        info!(?years, "fetching mesh data");

        let e = &self.endpoints;
        let current = self.fetch_shard::<CurrentStats>(e.current_stats(), "current stats", None);
        let stats = join_all(years.iter().map(|&year| {
            self.fetch_shard::<YearlyStats>(e.yearly_stats(year), "yearly stats", Some(year))
        }));
        let votes = join_all(years.iter().map(|&year| async move {
            let shard = self
                .fetch_shard::<Vec<Value>>(e.yearly_votes(year), "yearly votes", Some(year))
                .await;
            shard.map(|records| decode_votes(year, records))
        }));

        let (current_stats, stats, votes) = tokio::join!(current, stats, votes);

        let yearly_stats: BTreeMap<i32, YearlyStats> = years
            .iter()
            .zip(stats)
            .filter_map(|(&year, shard)| shard.map(|s| (year, s)))
            .collect();

        let mut votes: Vec<VoteRecord> = votes.into_iter().flatten().flatten().collect();
        sort_votes_desc(&mut votes);

        if current_stats.is_none() && yearly_stats.is_empty() {
            return Err(AggregateError::NoDataAvailable);
        }

        info!(
            years_loaded = yearly_stats.len(),
            votes = votes.len(),
            has_current_stats = current_stats.is_some(),
            "mesh data assembled"
        );

        Ok(MeshData {
            current_stats,
            yearly_stats,
            votes,
            last_fetched: self.clock.now_millis(),
        })
    }

    pub async fn fetch_catalyst_data(&self) -> Result<CatalystSnapshot, AggregateError> {
        let catalyst_data: CatalystData =
            fetch_typed(self.fetcher.as_ref(), &self.endpoints.catalyst()).await?;
        info!(projects = catalyst_data.projects.len(), "catalyst data fetched");
        Ok(CatalystSnapshot {
            catalyst_data,
            last_fetched: self.clock.now_millis(),
        })
    }

    /// Fetches and, on success, overwrites the cached mesh entry.
    pub async fn refresh_mesh(&self) -> Result<MeshData, AggregateError> {
        let data = self.fetch_mesh_data().await?;
        self.cache.write_entry(MESH_STORAGE_KEY, &data).await;
        Ok(data)
    }

    /// Fetches and, on success, overwrites the cached catalyst entry.
    pub async fn refresh_catalyst(&self) -> Result<CatalystSnapshot, AggregateError> {
        let data = self.fetch_catalyst_data().await?;
        self.cache.write_entry(CATALYST_STORAGE_KEY, &data).await;
        Ok(data)
    }

    pub async fn cached_mesh(&self) -> Option<MeshData> {
        self.fresh_entry(MESH_STORAGE_KEY, "mesh").await
    }

    pub async fn cached_catalyst(&self) -> Option<CatalystSnapshot> {
        self.fresh_entry(CATALYST_STORAGE_KEY, "catalyst").await
    }

    async fn fresh_entry<T: CacheEntry>(&self, key: &str, dataset: &str) -> Option<T> {
        let Some(entry) = self.cache.read_entry::<T>(key).await else {
            info!(dataset, "no cached data found, will fetch fresh data");
            return None;
        };

        let now = self.clock.now_millis();
        let age_minutes = now.saturating_sub(entry.last_fetched()) / 60_000;
        if self.policy.is_fresh(entry.last_fetched(), now) {
            info!(dataset, age_minutes, "using cached data");
            Some(entry)
        } else {
            info!(dataset, age_minutes, "cache expired, fetching fresh data");
            None
        }
    }

    async fn fetch_shard<T: DeserializeOwned>(
        &self,
        url: String,
        what: &str,
        year: Option<i32>,
    ) -> Option<T> {
        match fetch_typed::<T>(self.fetcher.as_ref(), &url).await {
            Ok(v) => Some(v),
            Err(error) => {
                warn!(what, ?year, %url, %error, "shard fetch failed, skipping");
                None
            }
        }
    }
}

/// Decodes a votes shard record by record; a record that does not decode is
/// dropped on its own.
fn decode_votes(year: i32, records: Vec<Value>) -> Vec<VoteRecord> {
    let total = records.len();
    let votes: Vec<VoteRecord> = records
        .into_iter()
        .filter_map(|r| serde_json::from_value(r).ok())
        .collect();
    if votes.len() < total {
        warn!(year, dropped = total - votes.len(), "skipping undecodable vote records");
    }
    votes
}

/// Most recent first. Stable, so equal times keep their shard order;
/// unparseable times go last.
pub fn sort_votes_desc(votes: &mut [VoteRecord]) {
    votes.sort_by_key(|v| Reverse(v.block_timestamp()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use govdata::Vote;
    use kvstore::Storage;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_current_stats_failure_with_yearly_data_still_succeeds() {
        let e = endpoints();
        let fetcher = FakeFetcher::new()
            .ok(e.yearly_stats(2024), yearly_stats_json(2024, 56420))
            .ok(e.yearly_votes(2024), json!([vote_json("a", "Yes", "2024-03-01T00:00:00Z")]))
            .ok(e.yearly_votes(2025), json!([vote_json("b", "No", "2025-01-01T00:00:00Z")]));
        let h = harness(fetcher, CachePolicy::default()).await;

        let data = h.aggregator.fetch_mesh_data().await.unwrap();

        assert!(data.current_stats.is_none());
        assert_eq!(data.yearly_stats.len(), 1);
        assert_eq!(data.yearly_stats[&2024].yearly_totals.core, 56420);
        let got: Vec<_> = data
            .votes
            .iter()
            .map(|v| (v.vote.clone(), v.block_time.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (Vote::No, "2025-01-01T00:00:00Z"),
                (Vote::Yes, "2024-03-01T00:00:00Z"),
            ]
        );
        assert_eq!(data.last_fetched, MID_2025);
    }

    #[tokio::test]
    async fn test_no_stats_at_all_is_no_data_available() {
        let e = endpoints();
        let fetcher = FakeFetcher::new()
            .status(e.current_stats(), 500)
            .ok(e.yearly_votes(2025), json!([vote_json("b", "No", "2025-01-01")]));
        let h = harness(fetcher, CachePolicy::default()).await;

        let err = h.aggregator.refresh_mesh().await.unwrap_err();
        assert!(matches!(err, AggregateError::NoDataAvailable));
        // nothing partial was persisted
        assert!(h.storage.get(MESH_STORAGE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_vote_shard_is_omitted() {
        let e = endpoints();
        let fetcher = FakeFetcher::new()
            .ok(e.current_stats(), current_stats_json())
            .status(e.yearly_votes(2024), 404)
            .ok(e.yearly_votes(2025), json!([vote_json("b", "No", "2025-01-01T00:00:00Z")]));
        let h = harness(fetcher, CachePolicy::default()).await;

        let data = h.aggregator.fetch_mesh_data().await.unwrap();
        assert_eq!(data.votes.len(), 1);
        assert_eq!(data.votes[0].proposal_id, "b");
        assert!(data.yearly_stats.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_shard_is_treated_as_missing() {
        let e = endpoints();
        let fetcher = FakeFetcher::new()
            .ok(e.yearly_stats(2024), yearly_stats_json(2024, 1))
            .ok(e.yearly_votes(2024), json!({ "not": "an array" }));
        let h = harness(fetcher, CachePolicy::default()).await;

        let data = h.aggregator.fetch_mesh_data().await.unwrap();
        assert!(data.votes.is_empty());
    }

    #[tokio::test]
    async fn test_bad_records_do_not_sink_their_shard() {
        let e = endpoints();
        let mut missing_time = vote_json("no-time", "Yes", "");
        missing_time.as_object_mut().unwrap().remove("blockTime");
        let mut null_rationale = vote_json("null-rationale", "No", "2024-05-01T00:00:00Z");
        null_rationale["rationale"] = Value::Null;
        let mut wrong_type = vote_json("wrong-type", "Yes", "2024-06-01T00:00:00Z");
        wrong_type["proposalIndex"] = json!("first");

        let fetcher = FakeFetcher::new()
            .ok(e.current_stats(), current_stats_json())
            .ok(
                e.yearly_votes(2024),
                json!([
                    vote_json("a", "Yes", "2024-03-01T00:00:00Z"),
                    null_rationale,
                    wrong_type,
                    "not a record",
                ]),
            )
            .ok(
                e.yearly_votes(2025),
                json!([vote_json("b", "No", "2025-01-01T00:00:00Z"), missing_time]),
            );
        let h = harness(fetcher, CachePolicy::default()).await;

        let data = h.aggregator.fetch_mesh_data().await.unwrap();
        let ids: Vec<_> = data.votes.iter().map(|v| v.proposal_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "null-rationale", "a", "no-time"]);
        assert_eq!(data.votes[1].rationale, "");
    }

    #[tokio::test]
    async fn test_cached_entry_with_absurd_timestamp_is_a_miss() {
        let h = harness(FakeFetcher::new(), CachePolicy::default()).await;
        for last_fetched in [i64::MIN, i64::MAX] {
            let raw = json!({
                "currentStats": null,
                "yearlyStats": {},
                "votes": [],
                "lastFetched": last_fetched
            });
            h.storage.put(MESH_STORAGE_KEY, &raw.to_string()).unwrap();
            assert!(h.aggregator.cached_mesh().await.is_none());
        }
    }

    #[tokio::test]
    async fn test_votes_are_non_increasing_in_time() {
        let e = endpoints();
        let fetcher = FakeFetcher::new()
            .ok(e.current_stats(), current_stats_json())
            .ok(
                e.yearly_votes(2024),
                json!([
                    vote_json("a", "Yes", "2024-02-01T00:00:00Z"),
                    vote_json("b", "No", "2024-12-30T00:00:00Z"),
                    vote_json("c", "Abstain", "2024-07-15T08:00:00Z"),
                ]),
            )
            .ok(
                e.yearly_votes(2025),
                json!([
                    vote_json("d", "Yes", "2025-03-01T00:00:00Z"),
                    vote_json("e", "Yes", "2025-01-10T00:00:00Z"),
                ]),
            );
        let h = harness(fetcher, CachePolicy::default()).await;

        let data = h.aggregator.fetch_mesh_data().await.unwrap();
        let times: Vec<_> = data.votes.iter().map(|v| v.block_timestamp().unwrap()).collect();
        assert!(times.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(data.votes[0].proposal_id, "d");
    }

    #[test]
    fn test_sort_is_stable_and_puts_unparseable_last() {
        let mut votes: Vec<VoteRecord> = [
            ("x", "not a date"),
            ("first", "2024-05-01"),
            ("second", "2024-05-01"),
            ("newest", "2024-06-01"),
        ]
        .iter()
        .map(|(id, t)| serde_json::from_value(vote_json(id, "Yes", t)).unwrap())
        .collect();

        sort_votes_desc(&mut votes);
        let ids: Vec<_> = votes.iter().map(|v| v.proposal_id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "first", "second", "x"]);
    }

    #[tokio::test]
    async fn test_years_span_start_to_current() {
        let h = harness(FakeFetcher::new(), CachePolicy::default()).await;
        assert_eq!(h.aggregator.years(), vec![2024, 2025]);
        h.clock.set(1_767_225_600_000); // 2026-01-01
        assert_eq!(h.aggregator.years(), vec![2024, 2025, 2026]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shards_are_fetched_concurrently() {
        let fetcher = full_fetcher().with_delay(Duration::from_millis(100));
        let h = harness(fetcher, CachePolicy::default()).await;

        let started = tokio::time::Instant::now();
        h.aggregator.fetch_mesh_data().await.unwrap();
        // five shards, one round trip
        assert_eq!(h.fetcher.call_count(), 5);
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_refresh_persists_and_cached_entries_respect_age() {
        let h = harness(full_fetcher(), CachePolicy::default()).await;

        assert!(h.aggregator.cached_mesh().await.is_none());
        let fresh = h.aggregator.refresh_mesh().await.unwrap();
        h.aggregator.refresh_catalyst().await.unwrap();

        assert_eq!(h.aggregator.cached_mesh().await, Some(fresh));
        assert!(h.aggregator.cached_catalyst().await.is_some());

        h.clock.advance(DEFAULT_AGE_LIMIT_MS);
        assert!(h.aggregator.cached_mesh().await.is_none());
        assert!(h.aggregator.cached_catalyst().await.is_none());
    }

    const DEFAULT_AGE_LIMIT_MS: i64 = 3 * 24 * 60 * 60 * 1000;

    #[tokio::test]
    async fn test_catalyst_failure_is_reported() {
        let fetcher = FakeFetcher::new().status(endpoints().catalyst(), 503);
        let h = harness(fetcher, CachePolicy::default()).await;
        let err = h.aggregator.refresh_catalyst().await.unwrap_err();
        assert!(matches!(err, AggregateError::Fetch(FetchError::Http { status: 503 })));
        assert!(h.storage.get(CATALYST_STORAGE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_must_fetch_when_cache_disabled_or_unavailable() {
        let h = harness(FakeFetcher::new(), CachePolicy::disabled()).await;
        assert!(h.aggregator.must_fetch());

        let h = harness_with_cache(
            FakeFetcher::new(),
            CachePolicy::default(),
            kvstore::InMemoryStorage::new(),
            CacheStore::Unavailable,
        );
        assert!(h.aggregator.must_fetch());

        let h = harness(FakeFetcher::new(), CachePolicy::default()).await;
        assert!(!h.aggregator.must_fetch());
    }
}
