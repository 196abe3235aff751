//! Pure normalization and aggregation functions over sets and sessions
//! (§4.1). Every function here is a pure function of its inputs — no
//! fallible cases, only clamps and saturations.

use crate::config::Config;
use crate::models::{CompletedSet, ExerciseDefinition, SessionResult, SessionType};

/// `rest_factor(r) = clamp((max(r,30)/180)^0.20, 0.80, 1.05)`.
pub fn rest_factor(cfg: &Config, rest_s: f64) -> f64 {
    let r = rest_s.max(cfg.rest_factor_floor_s);
    let raw = (r / cfg.rest_factor_ref_s).powf(cfg.rest_factor_exponent);
    raw.clamp(cfg.rest_factor_min, cfg.rest_factor_max)
}

/// `effective_reps(reps, rest_s) = reps / rest_factor(rest_s)`.
pub fn effective_reps(cfg: &Config, reps: f64, rest_s: f64) -> f64 {
    reps / rest_factor(cfg, rest_s)
}

/// Bodyweight-normalized rep count.
///
/// `L_rel = (bw*bw_fraction + added) / (bw_ref*bw_fraction)` when
/// `bw_fraction > 0`, else `(added + eps) / (added_ref + eps)`. Returns
/// `reps * L_rel^1.0` (linear — kept as a named exponent for clarity since
/// the spec calls out the exponent explicitly).
pub fn bodyweight_normalized_reps(
    reps: f64,
    bw_kg: f64,
    added_kg: f64,
    bw_ref_kg: f64,
    added_ref_kg: f64,
    bw_fraction: f64,
) -> f64 {
    const EPS: f64 = 1e-6;
    let l_rel = if bw_fraction > 0.0 {
        (bw_kg * bw_fraction + added_kg) / (bw_ref_kg * bw_fraction)
    } else {
        (added_kg + EPS) / (added_ref_kg + EPS)
    };
    reps * l_rel.powf(1.0)
}

/// `variant_normalized(reps, factor) = reps * factor`.
pub fn variant_normalized(reps: f64, factor: f64) -> f64 {
    reps * factor
}

/// Max reps over sets performed with no added weight, else 0.
pub fn session_max_bw_only(session: &SessionResult) -> u32 {
    session
        .sets
        .iter()
        .filter(|s| s.weight_kg == 0.0)
        .map(|s| s.reps)
        .max()
        .unwrap_or(0)
}

/// `drop_off = 1 - mean(last two sets' reps) / first set reps`. Undefined
/// (treated as 0) when fewer than 3 sets were logged.
pub fn drop_off(session: &SessionResult) -> f64 {
    let sets = &session.sets;
    if sets.len() < 3 {
        return 0.0;
    }
    let first = sets[0].reps as f64;
    if first == 0.0 {
        return 0.0;
    }
    let n = sets.len();
    let mean_last_two = (sets[n - 1].reps as f64 + sets[n - 2].reps as f64) / 2.0;
    1.0 - mean_last_two / first
}

/// `training_max_from(latest_test_max) = max(1, floor(0.9*x))`.
pub fn training_max_from(cfg: &Config, latest_test_max: f64) -> i64 {
    ((latest_test_max * cfg.training_max_factor).floor() as i64).max(1)
}

/// `estimate_rir(reps, m_hat) = clamp(m_hat - reps, 0, 5)`, used only when
/// RIR wasn't reported for a set.
pub fn estimate_rir(reps: f64, m_hat: f64) -> f64 {
    (m_hat - reps).clamp(0.0, 5.0)
}

/// RIR for a completed set: the reported value if present, else the
/// estimate derived from the current max.
pub fn set_rir(set: &CompletedSet, m_hat: f64) -> f64 {
    match set.rir {
        Some(r) => r as f64,
        None => estimate_rir(set.reps as f64, m_hat),
    }
}

/// One (date, reps) TEST observation, used by `linear_trend`.
#[derive(Debug, Clone, Copy)]
pub struct TrendPoint {
    pub day_offset: f64,
    pub reps: f64,
}

/// Ordinary least-squares slope, in reps-per-week, over TEST points within
/// `window_days` of the latest point. Returns 0 if fewer than 2 points fall
/// in the window.
pub fn linear_trend(points: &[TrendPoint], window_days: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let latest = points.iter().map(|p| p.day_offset).fold(f64::MIN, f64::max);
    let windowed: Vec<TrendPoint> = points
        .iter()
        .copied()
        .filter(|p| latest - p.day_offset <= window_days)
        .collect();
    if windowed.len() < 2 {
        return 0.0;
    }
    let n = windowed.len() as f64;
    let mean_x = windowed.iter().map(|p| p.day_offset).sum::<f64>() / n;
    let mean_y = windowed.iter().map(|p| p.reps).sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for p in &windowed {
        let dx = p.day_offset - mean_x;
        num += dx * (p.reps - mean_y);
        den += dx * dx;
    }
    if den.abs() < 1e-9 {
        return 0.0;
    }
    let slope_per_day = num / den;
    slope_per_day * 7.0
}

/// Fraction of target reps actually performed in one session.
pub fn compliance(actual_reps: f64, target_reps: f64) -> f64 {
    if target_reps <= 0.0 {
        return 1.0;
    }
    actual_reps / target_reps
}

/// Mean per-session compliance over the trailing N weeks.
pub fn weekly_compliance(session_compliances: &[f64]) -> f64 {
    if session_compliances.is_empty() {
        return 1.0;
    }
    session_compliances.iter().sum::<f64>() / session_compliances.len() as f64
}

/// Sum of actual reps across a session's completed sets.
pub fn sum_actual_reps(session: &SessionResult) -> f64 {
    session.sets.iter().map(|s| s.reps as f64).sum()
}

/// Whether a session type counts toward rotation/scheduling (i.e. not a
/// rest day placeholder).
pub fn is_training_session(session_type: SessionType) -> bool {
    !matches!(session_type, SessionType::Rest)
}

/// Convenience: compute `L_rel` the way the impulse formula in §4.2 does,
/// reusing the exercise's bw_fraction and the profile's reference
/// bodyweight (the bodyweight logged on the session itself is the
/// reference — the impulse formula operates per-session, not against a
/// fixed historical baseline).
pub fn l_rel_for_set(exercise: &ExerciseDefinition, set: &CompletedSet, bw_kg: f64) -> f64 {
    const EPS: f64 = 1e-6;
    if exercise.bw_fraction > 0.0 {
        (bw_kg * exercise.bw_fraction + set.weight_kg) / (bw_kg * exercise.bw_fraction).max(EPS)
    } else {
        (set.weight_kg + EPS) / EPS
    }
}
