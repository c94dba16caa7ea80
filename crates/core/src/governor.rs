//! Storage governor eviction policy.
//!
//! Pure planning half of the artifact storage governor: given the configured
//! byte budget, the current governed total, and the ready artifacts in
//! least-recently-accessed-first order, decide which rows to evict. The I/O
//! half (reading the budget, unlinking files, deleting rows) lives in the
//! API layer.
//!
//! Exports are large and re-derivable, so plain time-ordered LRU is enough.
//! Two artifacts are always safe from a pass: the sole remaining ready row,
//! and the most recently accessed row -- the one the user is working with --
//! which stays protected even when it alone exceeds the budget.

use crate::types::DbId;

/// A ready artifact as seen by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyArtifact {
    pub id: DbId,
    pub size_bytes: i64,
}

/// The rows a governor pass should evict, oldest first.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    pub victims: Vec<ReadyArtifact>,
    pub freed_bytes: i64,
}

impl EvictionPlan {
    pub fn is_empty(&self) -> bool {
        self.victims.is_empty()
    }
}

/// Plan one eviction pass.
///
/// `oldest_first` must be every ready row ordered by ascending
/// `last_accessed_at`; the final element is the protected hot slot.
///
/// Returns an empty plan when:
/// - `budget_bytes <= 0` (governing disabled),
/// - the governed total is already within budget,
/// - fewer than two ready rows exist (never evict the sole artifact).
///
/// Otherwise victims are taken oldest to youngest, skipping the protected
/// row, until the freed bytes cover the overshoot. A pass that runs out of
/// evictable rows returns what it found; the next pass converges further.
pub fn plan_eviction(
    budget_bytes: i64,
    total_ready_bytes: i64,
    oldest_first: &[ReadyArtifact],
) -> EvictionPlan {
    let mut plan = EvictionPlan::default();

    if budget_bytes <= 0 || total_ready_bytes <= budget_bytes || oldest_first.len() < 2 {
        return plan;
    }

    let need = total_ready_bytes - budget_bytes;
    let protected_id = oldest_first[oldest_first.len() - 1].id;

    for row in oldest_first {
        if plan.freed_bytes >= need {
            break;
        }
        if row.id == protected_id {
            continue;
        }
        plan.freed_bytes += row.size_bytes;
        plan.victims.push(row.clone());
    }

    plan
}

/// Human-readable byte formatting for governor logging.
pub fn format_bytes(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    let b = bytes as f64;
    if b >= TB {
        format!("{:.2} TB", b / TB)
    } else if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(id: DbId, size_bytes: i64) -> ReadyArtifact {
        ReadyArtifact { id, size_bytes }
    }

    #[test]
    fn zero_or_negative_budget_disables_governing() {
        let rows = [artifact(1, 100), artifact(2, 100)];
        assert!(plan_eviction(0, 200, &rows).is_empty());
        assert!(plan_eviction(-1, 200, &rows).is_empty());
    }

    #[test]
    fn under_budget_is_a_no_op() {
        let rows = [artifact(1, 40), artifact(2, 40)];
        assert!(plan_eviction(100, 80, &rows).is_empty());
    }

    #[test]
    fn sole_artifact_is_never_evicted() {
        let rows = [artifact(1, 500)];
        assert!(plan_eviction(100, 500, &rows).is_empty());
    }

    #[test]
    fn evicts_oldest_until_overshoot_is_covered() {
        // Budget 100; sizes 60/30/20 (oldest first) plus a freshly marked
        // 50-byte artifact. Overshoot is 60, so only the 60-byte row goes.
        let rows = [
            artifact(1, 60),
            artifact(2, 30),
            artifact(3, 20),
            artifact(4, 50),
        ];
        let plan = plan_eviction(100, 160, &rows);
        assert_eq!(plan.victims, vec![artifact(1, 60)]);
        assert_eq!(plan.freed_bytes, 60);
    }

    #[test]
    fn most_recently_accessed_row_is_protected() {
        // Even when the hot row alone exceeds the budget, it survives and
        // everything older is taken instead.
        let rows = [artifact(1, 10), artifact(2, 20), artifact(3, 500)];
        let plan = plan_eviction(100, 530, &rows);
        assert_eq!(plan.victims, vec![artifact(1, 10), artifact(2, 20)]);
        assert!(plan.victims.iter().all(|v| v.id != 3));
    }

    #[test]
    fn stops_as_soon_as_enough_is_freed() {
        let rows = [
            artifact(1, 50),
            artifact(2, 50),
            artifact(3, 50),
            artifact(4, 50),
        ];
        // Total 200, budget 120: need 80, two oldest rows cover it.
        let plan = plan_eviction(120, 200, &rows);
        assert_eq!(plan.victims.len(), 2);
        assert_eq!(plan.freed_bytes, 100);
    }

    #[test]
    fn format_bytes_picks_sensible_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
