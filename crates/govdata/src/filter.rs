//! Free-text search combined with structured filters.
//!
//! Every function here is pure. With an empty search term and no filters the
//! input slice is handed back as-is (`Cow::Borrowed`); otherwise the matching
//! records are cloned out in input order.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    CatalystSnapshot, MeshData, MonthlyDownloadRow, PackageDownloads, ProjectRecord, VoteRecord,
};

/// Active filters keyed by filter id (`vote`, `status`, `fundingRound`, ...).
pub type Filters = BTreeMap<String, String>;

fn active<'a>(filters: &'a Filters, id: &str) -> Option<&'a str> {
    filters.get(id).map(String::as_str).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn is_noop(search_term: &str, filters: &Filters) -> bool {
    search_term.is_empty() && filters.is_empty()
}

pub fn filter_votes<'a>(
    votes: &'a [VoteRecord],
    search_term: &str,
    filters: &Filters,
) -> Cow<'a, [VoteRecord]> {
    if is_noop(search_term, filters) {
        return Cow::Borrowed(votes);
    }

    let term = search_term.to_lowercase();
    let vote_filter = active(filters, "vote");
    let type_filter = active(filters, "proposalType");

    votes
        .iter()
        .filter(|v| {
            let search_match = term.is_empty()
                || contains_ci(&v.proposal_title, &term)
                || contains_ci(&v.proposal_type, &term)
                || contains_ci(&v.rationale, &term)
                || contains_ci(&v.proposal_id, &term);

            search_match
                && vote_filter.map_or(true, |f| v.vote.as_str() == f)
                && type_filter.map_or(true, |f| v.proposal_type == f)
        })
        .cloned()
        .collect::<Vec<_>>()
        .into()
}

pub fn filter_proposals<'a>(
    projects: &'a [ProjectRecord],
    search_term: &str,
    filters: &Filters,
) -> Cow<'a, [ProjectRecord]> {
    if is_noop(search_term, filters) {
        return Cow::Borrowed(projects);
    }

    let term = search_term.to_lowercase();
    let status = active(filters, "status");
    let round = active(filters, "fundingRound");
    let category = active(filters, "category");

    projects
        .iter()
        .filter(|p| {
            let d = &p.project_details;
            let search_match = term.is_empty()
                || contains_ci(&d.title, &term)
                || contains_ci(&d.category, &term)
                || d.project_id.to_string().contains(&term);

            search_match
                && status.map_or(true, |f| d.status == f)
                && round.map_or(true, |f| p.funding_round() == f)
                && category.map_or(true, |f| d.category == f)
        })
        .cloned()
        .collect::<Vec<_>>()
        .into()
}

pub fn filter_stats<'a>(
    packages: &'a [PackageDownloads],
    search_term: &str,
    filters: &Filters,
) -> Cow<'a, [PackageDownloads]> {
    if is_noop(search_term, filters) {
        return Cow::Borrowed(packages);
    }

    let term = search_term.to_lowercase();
    let package = active(filters, "package");

    packages
        .iter()
        .filter(|p| {
            (term.is_empty() || contains_ci(&p.name, &term))
                && package.map_or(true, |f| p.name == f)
        })
        .cloned()
        .collect::<Vec<_>>()
        .into()
}

pub fn filter_monthly<'a>(
    rows: &'a [MonthlyDownloadRow],
    search_term: &str,
    filters: &Filters,
) -> Cow<'a, [MonthlyDownloadRow]> {
    if is_noop(search_term, filters) {
        return Cow::Borrowed(rows);
    }

    let term = search_term.to_lowercase();
    let trend = active(filters, "trend");

    rows.iter()
        .filter(|r| {
            (term.is_empty() || contains_ci(&r.name, &term))
                && trend.map_or(true, |f| r.trend == f)
        })
        .cloned()
        .collect::<Vec<_>>()
        .into()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    Vote,
    Proposal,
    Stat,
}

impl ResultKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vote" => Some(ResultKind::Vote),
            "proposal" => Some(ResultKind::Proposal),
            "stat" => Some(ResultKind::Stat),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum SearchResult {
    Vote(VoteRecord),
    Proposal(ProjectRecord),
    Stat(PackageDownloads),
}

/// Dashboard-wide search. A `type` filter (`vote`, `proposal`, `stat`)
/// narrows the result to one kind; an unrecognised `type` matches nothing.
/// The remaining filters go to the per-kind filter functions.
pub fn search_all(
    mesh: Option<&MeshData>,
    catalyst: Option<&CatalystSnapshot>,
    search_term: &str,
    filters: &Filters,
) -> Vec<SearchResult> {
    let kind = active(filters, "type").map(ResultKind::parse);
    let wants = |k: ResultKind| match kind {
        None => true,
        Some(parsed) => parsed == Some(k),
    };

    let mut rest = filters.clone();
    rest.remove("type");

    let mut out = Vec::new();
    if let Some(mesh) = mesh {
        if wants(ResultKind::Vote) {
            out.extend(
                filter_votes(&mesh.votes, search_term, &rest)
                    .iter()
                    .cloned()
                    .map(SearchResult::Vote),
            );
        }
    }
    if let Some(catalyst) = catalyst {
        if wants(ResultKind::Proposal) {
            out.extend(
                filter_proposals(&catalyst.catalyst_data.projects, search_term, &rest)
                    .iter()
                    .cloned()
                    .map(SearchResult::Proposal),
            );
        }
    }
    if let Some(mesh) = mesh {
        if wants(ResultKind::Stat) {
            if let Some(current) = &mesh.current_stats {
                let packages = crate::package_downloads(current);
                out.extend(
                    filter_stats(&packages, search_term, &rest)
                        .iter()
                        .cloned()
                        .map(SearchResult::Stat),
                );
            }
        }
    }
    out
}
