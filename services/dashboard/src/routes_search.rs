use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use govdata::{
    catalyst_filter_config, dashboard_filter_config, drep_voting_filter_config, filter_monthly,
    filter_proposals, filter_stats, filter_votes, mesh_stats_filter_config, monthly_rows,
    package_downloads, search_all, Filters, MonthlyDownloadRow, PackageDownloads, ProjectRecord,
    SearchFilterConfig, SearchResult, VoteRecord,
};
use serde::Serialize;

use crate::state::{DataSnapshot, SharedState};

/// `search` is the free-text term; every other query key is a filter.
fn split_query(mut params: Filters) -> (String, Filters) {
    let term = params.remove("search").unwrap_or_default();
    (term, params)
}

fn packages(snap: &DataSnapshot) -> Vec<PackageDownloads> {
    snap.mesh_data
        .as_ref()
        .and_then(|m| m.current_stats.as_ref())
        .map(package_downloads)
        .unwrap_or_default()
}

pub async fn get_votes(
    State(st): State<SharedState>,
    Query(params): Query<Filters>,
) -> Json<Vec<VoteRecord>> {
    let (term, filters) = split_query(params);
    let snap = st.snapshot().await;
    let votes = snap.mesh_data.as_ref().map(|m| m.votes.as_slice()).unwrap_or_default();
    Json(filter_votes(votes, &term, &filters).into_owned())
}

pub async fn get_proposals(
    State(st): State<SharedState>,
    Query(params): Query<Filters>,
) -> Json<Vec<ProjectRecord>> {
    let (term, filters) = split_query(params);
    let snap = st.snapshot().await;
    let projects = snap
        .catalyst_data
        .as_ref()
        .map(|c| c.catalyst_data.projects.as_slice())
        .unwrap_or_default();
    Json(filter_proposals(projects, &term, &filters).into_owned())
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub packages: Vec<PackageDownloads>,
    pub monthly: Vec<MonthlyDownloadRow>,
}

pub async fn get_stats(
    State(st): State<SharedState>,
    Query(params): Query<Filters>,
) -> Json<StatsResponse> {
    let (term, filters) = split_query(params);
    let snap = st.snapshot().await;
    let packages = packages(&snap);
    let monthly = snap
        .mesh_data
        .as_ref()
        .map(|m| monthly_rows(&m.yearly_stats))
        .unwrap_or_default();

    Json(StatsResponse {
        packages: filter_stats(&packages, &term, &filters).into_owned(),
        monthly: filter_monthly(&monthly, &term, &filters).into_owned(),
    })
}

pub async fn get_search(
    State(st): State<SharedState>,
    Query(params): Query<Filters>,
) -> Json<Vec<SearchResult>> {
    let (term, filters) = split_query(params);
    let snap = st.snapshot().await;
    Json(search_all(
        snap.mesh_data.as_deref(),
        snap.catalyst_data.as_deref(),
        &term,
        &filters,
    ))
}

pub async fn get_filters(
    State(st): State<SharedState>,
    Path(page): Path<String>,
) -> Result<Json<SearchFilterConfig>, StatusCode> {
    let snap = st.snapshot().await;
    let config = match page.as_str() {
        "dashboard" => dashboard_filter_config(),
        "votes" => {
            let votes = snap.mesh_data.as_ref().map(|m| m.votes.as_slice()).unwrap_or_default();
            drep_voting_filter_config(votes)
        }
        "proposals" => {
            let projects = snap
                .catalyst_data
                .as_ref()
                .map(|c| c.catalyst_data.projects.as_slice())
                .unwrap_or_default();
            catalyst_filter_config(projects)
        }
        "stats" => mesh_stats_filter_config(&packages(&snap)),
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Json(config))
}
