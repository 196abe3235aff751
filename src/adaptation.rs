//! Trend, plateau, underperformance, deload, autoregulation, overtraining
//! severity, progression rate and volume policy (§4.3).

use crate::config::Config;
use crate::metrics::{linear_trend, sum_actual_reps, training_max_from, weekly_compliance, TrendPoint};
use crate::models::{ExerciseDefinition, SessionResult, SessionType};
use crate::physiology::{build_state_series, observed_test_max, readiness_adjusted_prediction, Snapshot};
use chrono::{Duration, NaiveDate};

/// Training status summary (§4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingStatus {
    pub training_max: i64,
    pub latest_test_max: f64,
    pub trend_slope: f64,
    pub is_plateau: bool,
    pub deload_recommended: bool,
    pub readiness_z_score: f64,
    pub fitness: f64,
    pub fatigue: f64,
}

fn test_points_for(exercise: &ExerciseDefinition, history: &[SessionResult]) -> Vec<(NaiveDate, f64)> {
    let mut pts: Vec<(NaiveDate, f64)> = history
        .iter()
        .filter(|s| s.session_type == SessionType::Test)
        .map(|s| (s.date, observed_test_max(exercise, s)))
        .collect();
    pts.sort_by_key(|p| p.0);
    pts
}

/// `is_plateau`: slope below threshold AND no TEST within the plateau
/// window set a new all-time-best max.
pub fn is_plateau(cfg: &Config, tests: &[(NaiveDate, f64)], baseline: f64, slope: f64, as_of: NaiveDate) -> bool {
    if slope >= cfg.plateau_slope_threshold {
        return false;
    }
    let window_start = as_of - Duration::days(cfg.plateau_window_days);
    let mut best_so_far = baseline;
    let mut recent_new_pr = false;
    for &(date, m) in tests {
        if date > window_start && m > best_so_far {
            recent_new_pr = true;
        }
        if m > best_so_far {
            best_so_far = m;
        }
    }
    !recent_new_pr
}

/// Compute the full training status as of `as_of`, replaying `history`.
pub fn compute_status(
    cfg: &Config,
    exercise: &ExerciseDefinition,
    history: &[SessionResult],
    baseline_max: f64,
    profile_compliance: &[f64],
    as_of: NaiveDate,
) -> TrainingStatus {
    let series = build_state_series(cfg, exercise, history, baseline_max);
    let state = series
        .last()
        .map(|s| s.state_after)
        .unwrap_or_else(|| crate::models::FitnessFatigueState::new(baseline_max));

    let tests = test_points_for(exercise, history);
    let latest_test_max = tests.last().map(|p| p.1).unwrap_or(baseline_max);
    let training_max = training_max_from(cfg, latest_test_max);

    let trend_points: Vec<TrendPoint> = tests
        .iter()
        .map(|&(date, reps)| TrendPoint {
            day_offset: (date - as_of).num_days() as f64,
            reps,
        })
        .collect();
    let trend_slope = linear_trend(&trend_points, cfg.trend_window_days as f64);

    let plateau = is_plateau(cfg, &tests, baseline_max, trend_slope, as_of);
    let readiness_z = state.readiness_z();
    let underperform = is_underperforming(cfg, &series);
    let compliance = weekly_compliance(profile_compliance);
    let deload = (plateau && readiness_z < cfg.deload_readiness_z)
        || underperform
        || compliance < cfg.deload_compliance_threshold;

    TrainingStatus {
        training_max,
        latest_test_max,
        trend_slope,
        is_plateau: plateau,
        deload_recommended: deload,
        readiness_z_score: readiness_z,
        fitness: state.fitness,
        fatigue: state.fatigue,
    }
}

/// Underperformance: the last two non-TEST S sessions both came in under
/// 90% of the readiness-adjusted max prediction, each evaluated using the
/// state as of immediately before that session.
pub fn is_underperforming(cfg: &Config, series: &[Snapshot]) -> bool {
    let s_sessions: Vec<&Snapshot> = series
        .iter()
        .filter(|snap| snap.session.session_type == SessionType::S)
        .collect();
    if s_sessions.len() < 2 {
        return false;
    }
    let last_two = &s_sessions[s_sessions.len() - 2..];
    last_two.iter().all(|snap| {
        let predicted = readiness_adjusted_prediction(cfg, &snap.state_before);
        let actual = snap.session.max_reps() as f64;
        actual < cfg.underperformance_factor * predicted
    })
}

/// Autoregulation gate: fewer than `autoregulate_gate_sessions` completed
/// non-TEST sessions means base prescription passes through unchanged.
pub fn autoregulate_gate_open(cfg: &Config, non_test_session_count: u32) -> bool {
    non_test_session_count >= cfg.autoregulate_gate_sessions
}

/// Apply the readiness-z-based autoregulation rule to a base (sets, reps)
/// prescription. No-op unless the gate is open.
pub fn autoregulate(cfg: &Config, non_test_session_count: u32, readiness_z: f64, base_sets: u32, base_reps: u32) -> (u32, u32) {
    if !autoregulate_gate_open(cfg, non_test_session_count) {
        return (base_sets, base_reps);
    }
    if readiness_z < cfg.autoregulate_low_z {
        let reduced = ((base_sets as f64 * cfg.autoregulate_set_factor).floor() as u32).max(cfg.autoregulate_min_sets);
        (reduced, base_reps)
    } else if readiness_z > cfg.autoregulate_high_z {
        (base_sets, base_reps + cfg.autoregulate_rep_bonus)
    } else {
        (base_sets, base_reps)
    }
}

/// Overtraining severity level (0-3) and the in-memory extra-rest-days
/// effect, computed over the trailing `overtraining_window_days` of
/// history for this exercise (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvertrainingSeverity {
    pub level: u8,
    pub extra_rest_days: i64,
}

pub fn overtraining_severity(cfg: &Config, history: &[SessionResult], days_per_week: u8, as_of: NaiveDate) -> OvertrainingSeverity {
    let window_start = as_of - Duration::days(cfg.overtraining_window_days - 1);
    let in_window: Vec<&SessionResult> = history
        .iter()
        .filter(|s| s.date >= window_start && s.date <= as_of)
        .collect();

    let non_rest: Vec<&&SessionResult> = in_window.iter().filter(|s| s.session_type != SessionType::Rest).collect();
    let n = non_rest.len() as f64;
    if n == 0.0 {
        return OvertrainingSeverity { level: 0, extra_rest_days: 0 };
    }
    let first = non_rest.iter().map(|s| s.date).min().unwrap();
    let last = non_rest.iter().map(|s| s.date).max().unwrap();
    let span = (last - first).num_days() as f64;
    let rest_days_in_window = in_window.iter().filter(|s| s.session_type == SessionType::Rest).count() as f64;

    let expected_time = n * (7.0 / days_per_week.max(1) as f64);
    let extra = (expected_time - (span + rest_days_in_window)).round().max(0.0);

    let level = if extra <= 0.0 {
        0
    } else if extra < 1.5 {
        1
    } else if extra < 4.0 {
        2
    } else {
        3
    };

    OvertrainingSeverity {
        level,
        extra_rest_days: extra as i64,
    }
}

/// Per-week training max progression (§4.3). `target` is the exercise's
/// target_value (max reps or kg, per target_metric).
pub fn progression_rate(cfg: &Config, training_max: f64, target: f64) -> f64 {
    let f = (1.0 - training_max / target).max(0.0);
    cfg.progression_base + (cfg.progression_max - cfg.progression_base) * f.powf(cfg.progression_exponent)
}

/// Volume policy: adjust a base weekly hard-set count per deload/z-score/
/// compliance state, floored/capped per config.
pub fn volume_policy(cfg: &Config, base_weekly_sets: f64, deload: bool, readiness_z: f64, weekly_compliance: f64) -> f64 {
    let adjusted = if deload {
        base_weekly_sets * cfg.volume_deload_factor
    } else if readiness_z < cfg.autoregulate_low_z {
        base_weekly_sets * cfg.volume_low_z_factor
    } else if readiness_z > cfg.autoregulate_high_z && weekly_compliance > cfg.volume_high_compliance_threshold {
        base_weekly_sets * cfg.volume_high_z_factor
    } else {
        base_weekly_sets
    };
    adjusted.clamp(cfg.volume_floor as f64, cfg.volume_cap as f64)
}
