//! Snapshot demo: the dashboard engine offline
//!
//! Shows:
//! 1. Decoding a mesh snapshot and a catalyst snapshot
//! 2. Vote and funding summaries
//! 3. Free-text search with filters
//! 4. Filter options derived from the data

use govdata::{
    catalyst_filter_config, catalyst_summary, drep_voting_filter_config, filter_proposals,
    filter_votes, format_ada, format_number, funding_progress, milestone_progress,
    package_downloads, search_all, vote_stats, CatalystSnapshot, Filters, MeshData,
};
use serde_json::json;

fn main() -> Result<(), serde_json::Error> {
    println!("╔════════════════════════════════════════════════╗");
    println!("║  Governance Dashboard - Snapshot Demo          ║");
    println!("╚════════════════════════════════════════════════╝\n");

    // 1. Decode
    println!("📦 Step 1: Decode snapshots");
    println!("   ─────────────────────────");

    let mesh: MeshData = serde_json::from_value(json!({
        "currentStats": {
            "github": { "core_in_package_json": 120, "core_in_any_file": 310 },
            "npm": {
                "downloads": { "last_day": 410, "last_week": 2900, "last_month": 12400, "last_year": 140000 },
                "react_package_downloads": 5300,
                "transaction_package_downloads": 2100,
                "wallet_package_downloads": 1800,
                "provider_package_downloads": 1500,
                "core_csl_package_downloads": 900,
                "core_cst_package_downloads": 700,
                "latest_version": "1.8.4",
                "dependents_count": 42
            }
        },
        "yearlyStats": {},
        "votes": [
            {
                "proposalId": "gov_action1abc", "proposalTxHash": "abc", "proposalIndex": 0,
                "voteTxHash": "v1", "blockTime": "2025-03-02T10:00:00Z", "vote": "Yes",
                "proposalTitle": "Treasury withdrawal for tooling",
                "proposalType": "TreasuryWithdrawals", "proposedEpoch": 540,
                "expirationEpoch": 546, "rationale": "Supports open source developer tooling"
            },
            {
                "proposalId": "gov_action1def", "proposalTxHash": "def", "proposalIndex": 0,
                "voteTxHash": "v2", "blockTime": "2025-01-15T08:30:00Z", "vote": "Abstain",
                "proposalTitle": "Constitution amendment",
                "proposalType": "NewConstitution", "proposedEpoch": 530,
                "expirationEpoch": 536, "rationale": "Needs more community review"
            },
            {
                "proposalId": "gov_action1ghi", "proposalTxHash": "ghi", "proposalIndex": 1,
                "voteTxHash": "v3", "blockTime": "2024-11-20T16:45:00Z", "vote": "No",
                "proposalTitle": "Parameter change: block size",
                "proposalType": "ParameterChange", "proposedEpoch": 520,
                "expirationEpoch": 526, "rationale": "Risk to network stability"
            }
        ],
        "lastFetched": 1748736000000_i64
    }))?;

    let catalyst: CatalystSnapshot = serde_json::from_value(json!({
        "catalystData": {
            "timestamp": "2025-05-30T12:00:00Z",
            "projects": [
                {
                    "projectDetails": {
                        "id": 1, "title": "Mesh SDK maintenance", "budget": 120000,
                        "milestones_qty": 4, "funds_distributed": 90000, "project_id": 1100271,
                        "category": "F11: Cardano Open Developers", "status": "In Progress",
                        "finished": ""
                    },
                    "milestonesCompleted": 3
                },
                {
                    "projectDetails": {
                        "id": 2, "title": "Multisig platform", "budget": 75000,
                        "milestones_qty": 3, "funds_distributed": 75000, "project_id": 1000107,
                        "category": "F10: Developer Ecosystem", "status": "Completed",
                        "finished": "2024-09-01"
                    },
                    "milestonesCompleted": 3
                }
            ]
        },
        "lastFetched": 1748736000000_i64
    }))?;

    let projects = &catalyst.catalyst_data.projects;
    println!("   Votes: {}", mesh.votes.len());
    println!("   Catalyst projects: {}", projects.len());
    println!("   ✓ Snapshots decoded\n");

    // 2. Summaries
    println!("📊 Step 2: Summaries");
    println!("   ──────────────────");

    let stats = vote_stats(&mesh.votes);
    println!(
        "   Votes: {} total, {} yes, {} no, {} abstain",
        stats.total, stats.yes, stats.no, stats.abstain
    );
    let summary = catalyst_summary(projects);
    println!(
        "   Funding: {} of {} distributed, {}/{} projects completed",
        format_ada(summary.total_distributed),
        format_ada(summary.total_budget),
        summary.completed_projects,
        summary.total_projects
    );
    for p in projects {
        println!(
            "   {:<24} milestones {:>5.1}%  funds {:>5.1}%",
            p.project_details.title,
            milestone_progress(p),
            funding_progress(p)
        );
    }
    if let Some(current) = &mesh.current_stats {
        for pkg in package_downloads(current) {
            println!("   {:<12} {:>8} downloads/month", pkg.name, format_number(pkg.downloads));
        }
    }
    println!();

    // 3. Search
    println!("🔍 Step 3: Search and filter");
    println!("   ─────────────────────────");

    let no_filters = Filters::new();
    let hits = filter_votes(&mesh.votes, "treasury", &no_filters);
    println!("   \"treasury\" in votes: {} hit(s)", hits.len());

    let mut status = Filters::new();
    status.insert("status".into(), "Completed".into());
    let done = filter_proposals(projects, "", &status);
    println!("   status=Completed: {} project(s)", done.len());

    let mut only_stats = Filters::new();
    only_stats.insert("type".into(), "stat".into());
    let results = search_all(Some(&mesh), Some(&catalyst), "core", &only_stats);
    println!("   \"core\" across the dashboard, stats only: {} result(s)", results.len());
    println!();

    // 4. Options
    println!("🧭 Step 4: Filter options from data");
    println!("   ────────────────────────────────");

    for config in [
        drep_voting_filter_config(&mesh.votes),
        catalyst_filter_config(projects),
    ] {
        println!("   {}", config.placeholder);
        for f in &config.filters {
            let values: Vec<_> = f.options.iter().map(|o| o.value.as_str()).collect();
            println!("     {:<16} {}", f.label, values.join(", "));
        }
    }

    println!("\n✓ Done");
    Ok(())
}
