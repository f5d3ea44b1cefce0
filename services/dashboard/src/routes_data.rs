use axum::{extract::State, http::StatusCode, Json};
use govdata::{
    catalyst_summary, proposal_type_counts, vote_stats, yearly_vote_breakdown, CatalystSummary,
    TypeCount, VoteStats, YearVotes,
};
use serde::Serialize;

use crate::state::{DataSnapshot, RefetchOutcome, SharedState};

pub async fn get_data(State(st): State<SharedState>) -> Json<DataSnapshot> {
    Json(st.snapshot().await)
}

pub async fn post_refetch(State(st): State<SharedState>) -> (StatusCode, Json<serde_json::Value>) {
    match st.spawn_refetch() {
        RefetchOutcome::AlreadyInFlight => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "status": "in_flight" })),
        ),
        _ => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "started" })),
        ),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub vote_stats: VoteStats,
    pub proposal_types: Vec<TypeCount>,
    pub yearly_votes: Vec<YearVotes>,
    pub catalyst: Option<CatalystSummary>,
}

pub async fn get_summary(State(st): State<SharedState>) -> Json<SummaryResponse> {
    let snap = st.snapshot().await;
    let votes = snap.mesh_data.as_ref().map(|m| m.votes.as_slice()).unwrap_or_default();

    Json(SummaryResponse {
        vote_stats: vote_stats(votes),
        proposal_types: proposal_type_counts(votes),
        yearly_votes: yearly_vote_breakdown(votes),
        catalyst: snap
            .catalyst_data
            .as_ref()
            .map(|c| catalyst_summary(&c.catalyst_data.projects)),
    })
}
