use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, VecSkipError};

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

// ---------------------------------------------------------------------------
// Current aggregate stats (mesh_stats.json)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentStats {
    pub github: GithubStats,
    pub npm: NpmStats,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubStats {
    pub core_in_package_json: u64,
    pub core_in_any_file: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpmStats {
    pub downloads: DownloadWindows,
    pub react_package_downloads: u64,
    pub transaction_package_downloads: u64,
    pub wallet_package_downloads: u64,
    pub provider_package_downloads: u64,
    pub core_csl_package_downloads: u64,
    pub core_cst_package_downloads: u64,
    pub latest_version: String,
    pub dependents_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadWindows {
    pub last_day: u64,
    pub last_week: u64,
    pub last_month: u64,
    pub last_year: u64,
}

// ---------------------------------------------------------------------------
// Per-year stats (mesh-yearly-stats-<year>.json)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YearlyStats {
    pub year: i32,
    pub yearly_totals: YearlyTotals,
    pub monthly_downloads: Vec<MonthlyDownload>,
    pub peak_month: PeakMonth,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YearlyTotals {
    pub core: u64,
    pub react: u64,
    pub transaction: u64,
    pub wallet: u64,
    pub provider: u64,
    pub core_csl: u64,
    pub core_cst: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlyDownload {
    pub month: String,
    pub downloads: u64,
    pub trend: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakMonth {
    pub name: String,
    pub downloads: u64,
}

// ---------------------------------------------------------------------------
// DRep votes (<year>_voting.json)
// ---------------------------------------------------------------------------

/// A DRep decision. Strings other than `Yes`/`No`/`Abstain` are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vote {
    Yes,
    No,
    Abstain,
    #[serde(untagged)]
    Other(String),
}

impl Default for Vote {
    fn default() -> Self {
        Vote::Other(String::new())
    }
}

impl Vote {
    pub fn as_str(&self) -> &str {
        match self {
            Vote::Yes => "Yes",
            Vote::No => "No",
            Vote::Abstain => "Abstain",
            Vote::Other(s) => s,
        }
    }
}

/// Missing or `null` fields decode to their defaults; a vote without a
/// parseable `blockTime` is kept and sorts last.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VoteRecord {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub proposal_id: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub proposal_tx_hash: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub proposal_index: u32,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub vote_tx_hash: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub block_time: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub vote: Vote,
    pub meta_url: Option<String>,
    pub meta_hash: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub proposal_title: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub proposal_type: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub proposed_epoch: u64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub expiration_epoch: u64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub rationale: String,
}

impl VoteRecord {
    /// `blockTime` as milliseconds since the epoch, `None` if unparseable.
    pub fn block_timestamp(&self) -> Option<Millis> {
        parse_timestamp(&self.block_time)
    }
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC) and a
/// bare `YYYY-MM-DD` (UTC midnight).
pub fn parse_timestamp(s: &str) -> Option<Millis> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }
    None
}

// ---------------------------------------------------------------------------
// Catalyst proposals (catalyst-data.json)
// ---------------------------------------------------------------------------

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDetails {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub id: i64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub title: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub budget: f64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub milestones_qty: u32,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub funds_distributed: f64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub project_id: i64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub category: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub status: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub finished: String,
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub project_details: ProjectDetails,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub milestones_completed: u32,
}

impl ProjectRecord {
    /// Funding round prefix of the category, e.g. `"F10"` for `"F10: Developer Tools"`.
    pub fn funding_round(&self) -> String {
        self.project_details.category.chars().take(3).collect()
    }
}

/// Projects that fail to decode (wrong field types) are dropped one by one
/// instead of failing the whole file.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalystData {
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub timestamp: String,
    #[serde_as(deserialize_as = "VecSkipError<_>")]
    pub projects: Vec<ProjectRecord>,
}

// ---------------------------------------------------------------------------
// Aggregates (what the cache stores and the dashboard serves)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshData {
    pub current_stats: Option<CurrentStats>,
    pub yearly_stats: BTreeMap<i32, YearlyStats>,
    /// Most recent first.
    pub votes: Vec<VoteRecord>,
    pub last_fetched: Millis,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalystSnapshot {
    pub catalyst_data: CatalystData,
    pub last_fetched: Millis,
}

// ---------------------------------------------------------------------------
// Derived rows for the stats view
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackageDownloads {
    pub name: String,
    pub downloads: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyDownloadRow {
    pub name: String,
    pub downloads: u64,
    pub trend: String,
}
