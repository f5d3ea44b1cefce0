//! Filter bar configurations.
//!
//! Option lists that depend on the data are derived on every call from the
//! records passed in; nothing is memoised here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{PackageDownloads, ProjectRecord, VoteRecord};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
}

impl FilterOption {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub id: String,
    pub label: String,
    pub options: Vec<FilterOption>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchFilterConfig {
    pub placeholder: String,
    pub filters: Vec<FilterConfig>,
}

/// Distinct non-empty values of `field` in first-seen order.
pub fn distinct_options<T, F>(records: &[T], field: F) -> Vec<FilterOption>
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    records
        .iter()
        .map(field)
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .map(|v| FilterOption {
            label: v.clone(),
            value: v,
        })
        .collect()
}

fn filter(id: &str, label: &str, options: Vec<FilterOption>) -> FilterConfig {
    FilterConfig {
        id: id.to_string(),
        label: label.to_string(),
        options,
    }
}

pub fn dashboard_filter_config() -> SearchFilterConfig {
    SearchFilterConfig {
        placeholder: "Search across votes, proposals, and stats...".into(),
        filters: vec![filter(
            "type",
            "Result Type",
            vec![
                FilterOption::new("DRep Votes", "vote"),
                FilterOption::new("Catalyst Proposals", "proposal"),
                FilterOption::new("Mesh Stats", "stat"),
            ],
        )],
    }
}

pub fn drep_voting_filter_config(votes: &[VoteRecord]) -> SearchFilterConfig {
    SearchFilterConfig {
        placeholder: "Search votes by title, rationale, or type...".into(),
        filters: vec![
            filter(
                "vote",
                "Vote Decision",
                vec![
                    FilterOption::new("Yes", "Yes"),
                    FilterOption::new("No", "No"),
                    FilterOption::new("Abstain", "Abstain"),
                ],
            ),
            filter(
                "proposalType",
                "Proposal Type",
                distinct_options(votes, |v| v.proposal_type.clone()),
            ),
        ],
    }
}

pub fn catalyst_filter_config(projects: &[ProjectRecord]) -> SearchFilterConfig {
    SearchFilterConfig {
        placeholder: "Search proposals by title, category, or project ID...".into(),
        filters: vec![
            filter(
                "status",
                "Status",
                distinct_options(projects, |p| p.project_details.status.clone()),
            ),
            filter(
                "fundingRound",
                "Funding Round",
                distinct_options(projects, ProjectRecord::funding_round),
            ),
            filter(
                "category",
                "Category",
                distinct_options(projects, |p| p.project_details.category.clone()),
            ),
        ],
    }
}

pub fn mesh_stats_filter_config(packages: &[PackageDownloads]) -> SearchFilterConfig {
    SearchFilterConfig {
        placeholder: "Search statistics by package name or trend...".into(),
        filters: vec![
            filter(
                "package",
                "Package",
                distinct_options(packages, |p| p.name.clone()),
            ),
            filter(
                "trend",
                "Trend",
                vec![
                    FilterOption::new("Increasing", "up"),
                    FilterOption::new("Decreasing", "down"),
                    FilterOption::new("Stable", "stable"),
                ],
            ),
        ],
    }
}
