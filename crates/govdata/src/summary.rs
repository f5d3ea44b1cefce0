use std::collections::BTreeMap;

use chrono::{Datelike, TimeZone, Utc};
use serde::Serialize;

use crate::{
    CurrentStats, MonthlyDownloadRow, PackageDownloads, ProjectRecord, Vote, VoteRecord,
    YearlyStats,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VoteStats {
    pub total: usize,
    pub yes: usize,
    pub no: usize,
    pub abstain: usize,
}

pub fn vote_stats(votes: &[VoteRecord]) -> VoteStats {
    let mut s = VoteStats {
        total: votes.len(),
        ..Default::default()
    };
    for v in votes {
        match v.vote {
            Vote::Yes => s.yes += 1,
            Vote::No => s.no += 1,
            Vote::Abstain => s.abstain += 1,
            Vote::Other(_) => {}
        }
    }
    s
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub proposal_type: String,
    pub count: usize,
}

/// Votes per proposal type, in the order types first appear.
pub fn proposal_type_counts(votes: &[VoteRecord]) -> Vec<TypeCount> {
    let mut out: Vec<TypeCount> = Vec::new();
    for v in votes {
        match out.iter_mut().find(|t| t.proposal_type == v.proposal_type) {
            Some(t) => t.count += 1,
            None => out.push(TypeCount {
                proposal_type: v.proposal_type.clone(),
                count: 1,
            }),
        }
    }
    out
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct YearVotes {
    pub year: i32,
    pub yes: usize,
    pub no: usize,
    pub abstain: usize,
}

/// Yes/No/Abstain counts per UTC calendar year, most recent year first.
pub fn yearly_vote_breakdown(votes: &[VoteRecord]) -> Vec<YearVotes> {
    let mut by_year: BTreeMap<i32, YearVotes> = BTreeMap::new();
    for v in votes {
        let Some(ms) = v.block_timestamp() else { continue };
        let Some(dt) = Utc.timestamp_millis_opt(ms).single() else { continue };
        let entry = by_year.entry(dt.year()).or_insert_with(|| YearVotes {
            year: dt.year(),
            ..Default::default()
        });
        match v.vote {
            Vote::Yes => entry.yes += 1,
            Vote::No => entry.no += 1,
            Vote::Abstain => entry.abstain += 1,
            Vote::Other(_) => {}
        }
    }
    by_year.into_values().rev().collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CatalystSummary {
    pub total_projects: usize,
    pub completed_projects: usize,
    pub total_budget: f64,
    pub total_distributed: f64,
}

pub fn catalyst_summary(projects: &[ProjectRecord]) -> CatalystSummary {
    CatalystSummary {
        total_projects: projects.len(),
        completed_projects: projects
            .iter()
            .filter(|p| p.project_details.status == "Completed")
            .count(),
        total_budget: projects.iter().map(|p| p.project_details.budget).sum(),
        total_distributed: projects
            .iter()
            .map(|p| p.project_details.funds_distributed)
            .sum(),
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 || !part.is_finite() || !whole.is_finite() {
        return 0.0;
    }
    (part / whole * 100.0).clamp(0.0, 100.0)
}

/// Completed milestones as a percentage, clamped to [0, 100].
pub fn milestone_progress(project: &ProjectRecord) -> f64 {
    percent(
        f64::from(project.milestones_completed),
        f64::from(project.project_details.milestones_qty),
    )
}

/// Distributed funds as a percentage of budget, clamped to [0, 100].
pub fn funding_progress(project: &ProjectRecord) -> f64 {
    percent(
        project.project_details.funds_distributed,
        project.project_details.budget,
    )
}

pub fn package_downloads(stats: &CurrentStats) -> Vec<PackageDownloads> {
    let npm = &stats.npm;
    [
        ("Core", npm.downloads.last_month),
        ("React", npm.react_package_downloads),
        ("Transaction", npm.transaction_package_downloads),
        ("Wallet", npm.wallet_package_downloads),
        ("Provider", npm.provider_package_downloads),
        ("Core CSL", npm.core_csl_package_downloads),
        ("Core CST", npm.core_cst_package_downloads),
    ]
    .into_iter()
    .map(|(name, downloads)| PackageDownloads {
        name: name.to_string(),
        downloads,
    })
    .collect()
}

/// Monthly rows of the most recent loaded year.
pub fn monthly_rows(yearly: &BTreeMap<i32, YearlyStats>) -> Vec<MonthlyDownloadRow> {
    let Some((_, latest)) = yearly.iter().next_back() else {
        return Vec::new();
    };
    latest
        .monthly_downloads
        .iter()
        .map(|m| MonthlyDownloadRow {
            name: m.month.clone(),
            downloads: m.downloads,
            trend: m.trend.clone(),
        })
        .collect()
}

/// `1234567` -> `"1,234,567"`.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Whole ADA with thousands separators, e.g. `₳1,250,000`.
pub fn format_ada(amount: f64) -> String {
    let whole = if amount.is_finite() && amount > 0.0 {
        amount.round() as u64
    } else {
        0
    };
    format!("₳{}", format_number(whole))
}
