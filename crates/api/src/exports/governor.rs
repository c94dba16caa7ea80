//! Storage governor pass executor.
//!
//! Reads the configured byte budget, asks the core planner which ready
//! artifacts to evict, then removes each victim's file and row. The pass is
//! best-effort: per-row failures are logged and the pass continues, and a
//! pass interrupted mid-way leaves consistent state -- an orphaned file is
//! reclaimed by a later pass.

use std::collections::HashMap;

use rewind_core::governor::{format_bytes, plan_eviction, ReadyArtifact};
use rewind_core::types::DbId;
use rewind_db::repositories::{ClipExportRepo, SettingsRepo};
use rewind_db::DbPool;

use super::remove_file_best_effort;

/// Run one governor pass. Never fails the caller; storage errors are logged.
pub async fn run_pass(pool: &DbPool) {
    if let Err(e) = try_run_pass(pool).await {
        tracing::error!(error = %e, "Governor pass failed");
    }
}

async fn try_run_pass(pool: &DbPool) -> Result<(), sqlx::Error> {
    let budget = SettingsRepo::export_storage_budget(pool).await?;
    if budget <= 0 {
        return Ok(());
    }

    let total = ClipExportRepo::total_ready_bytes(pool).await?;
    if total <= budget {
        return Ok(());
    }

    let rows = ClipExportRepo::list_oldest_ready(pool).await?;
    let artifacts: Vec<ReadyArtifact> = rows
        .iter()
        .map(|r| ReadyArtifact {
            id: r.id,
            size_bytes: r.size_bytes.unwrap_or(0),
        })
        .collect();

    let plan = plan_eviction(budget, total, &artifacts);
    if plan.is_empty() {
        return Ok(());
    }

    tracing::info!(
        budget = %format_bytes(budget),
        total = %format_bytes(total),
        victims = plan.victims.len(),
        freeing = %format_bytes(plan.freed_bytes),
        "Governor evicting least-recently-accessed exports",
    );

    let paths: HashMap<DbId, Option<&str>> = rows
        .iter()
        .map(|r| (r.id, r.file_path.as_deref()))
        .collect();

    for victim in &plan.victims {
        if let Some(Some(path)) = paths.get(&victim.id) {
            remove_file_best_effort(path).await;
        }
        match ClipExportRepo::delete(pool, victim.id).await {
            Ok(_) => {
                tracing::debug!(
                    export_id = victim.id,
                    size = %format_bytes(victim.size_bytes),
                    "Evicted export artifact",
                );
            }
            Err(e) => {
                tracing::error!(export_id = victim.id, error = %e, "Failed to evict export row");
            }
        }
    }

    Ok(())
}
