//! Between-test max inference from ordinary training sessions ("Track B"),
//! combining a fatigue-index estimate with a reps~%1RM table lookup
//! (§4.4). Returns `None` when fewer than 2 sets were logged, matching
//! the spec's precondition.

use crate::config::Config;
use crate::models::SessionResult;

/// Fatigue index over a session's sets: `1 - mean(reps[1..]) / reps[0]`.
fn fatigue_index(reps: &[u32]) -> f64 {
    let first = reps[0] as f64;
    if first == 0.0 {
        return 0.0;
    }
    let rest: Vec<f64> = reps[1..].iter().map(|&r| r as f64).collect();
    let mean_rest = rest.iter().sum::<f64>() / rest.len() as f64;
    1.0 - mean_rest / first
}

/// FI-based max estimate (fi_est).
fn fi_estimate(cfg: &Config, session: &SessionResult) -> f64 {
    let reps: Vec<u32> = session.sets.iter().map(|s| s.reps).collect();
    let fi = fatigue_index(&reps);

    let rest_before_set1 = session
        .sets
        .first()
        .and_then(|s| s.rest_s)
        .map(|r| r as f64)
        .unwrap_or(cfg.default_rest_assumption_s);

    let reps1 = reps[0] as f64;
    let reps1_corrected = if rest_before_set1 < 300.0 {
        let factor = cfg.lookup_pcr_recovery(rest_before_set1);
        if factor > 0.0 {
            reps1 / factor
        } else {
            reps1
        }
    } else {
        reps1
    };

    reps1_corrected * (1.0 + (cfg.fi_target - fi).max(0.0) * cfg.fi_reserve_gain)
}

/// Nuzzo-table-based max estimate (nz_est).
fn nuzzo_estimate(cfg: &Config, session: &SessionResult) -> f64 {
    let reps: Vec<u32> = session.sets.iter().map(|s| s.reps).collect();
    let fi = fatigue_index(&reps);

    let (best_idx, &best_reps) = reps.iter().enumerate().max_by_key(|&(_, &r)| r).unwrap();
    let actual_max_reps = best_reps as f64;

    let rir_estimated = match session.sets[best_idx].rir {
        Some(r) => r as f64,
        None => ((cfg.fi_target - fi) * 8.0).round().max(0.0),
    };

    let r_hat = actual_max_reps + rir_estimated;
    let pct_1rm = cfg.lookup_pct_1rm(r_hat);
    if pct_1rm <= 0.0 {
        return r_hat;
    }
    (r_hat / pct_1rm).round()
}

/// Returns `(fi_est, nz_est)` for a non-TEST session with at least 2 sets,
/// or `None` otherwise.
pub fn track_b_estimate(cfg: &Config, session: &SessionResult) -> Option<(f64, f64)> {
    if session.sets.len() < 2 {
        return None;
    }
    Some((fi_estimate(cfg, session), nuzzo_estimate(cfg, session)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletedSet, SessionType};
    use chrono::NaiveDate;

    fn session_with(sets: Vec<CompletedSet>) -> SessionResult {
        SessionResult {
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            exercise_id: "pull_up".into(),
            session_type: SessionType::S,
            variant: "pronated".into(),
            bodyweight_kg: 80.0,
            sets,
            equipment: None,
            planned_sets: None,
            notes: None,
        }
    }

    #[test]
    fn test_track_b_none_with_single_set() {
        let cfg = Config::default();
        let session = session_with(vec![CompletedSet { reps: 10, weight_kg: 0.0, rest_s: Some(180), rir: None }]);
        assert!(track_b_estimate(&cfg, &session).is_none());
    }

    #[test]
    fn test_track_b_estimate_present_for_multi_set_session() {
        let cfg = Config::default();
        let session = session_with(vec![
            CompletedSet { reps: 10, weight_kg: 0.0, rest_s: Some(180), rir: Some(2) },
            CompletedSet { reps: 8, weight_kg: 0.0, rest_s: Some(180), rir: Some(1) },
            CompletedSet { reps: 6, weight_kg: 0.0, rest_s: Some(180), rir: Some(0) },
        ]);
        let (fi_est, nz_est) = track_b_estimate(&cfg, &session).unwrap();
        assert!(fi_est > 0.0);
        assert!(nz_est > 0.0);
    }

    #[test]
    fn test_fatigue_index_no_dropoff_is_zero() {
        let reps = vec![10, 10, 10];
        assert_eq!(fatigue_index(&reps), 0.0);
    }

    #[test]
    fn test_fatigue_index_with_dropoff() {
        let reps = vec![10, 8, 6];
        // mean(8,6)=7 -> 1 - 7/10 = 0.3
        assert!((fatigue_index(&reps) - 0.3).abs() < 1e-9);
    }
}
