//! Training-load impulse, the two-timescale fitness-fatigue state machine,
//! and the EWMA max estimator (§4.2). `build_state` is the single
//! deterministic replay entry point: `build_state(history) == build_state(history)`
//! for any history, by construction (it only folds over sorted records).

use crate::config::Config;
use crate::metrics::set_rir;
use crate::models::{ExerciseDefinition, FitnessFatigueState, SessionResult, SessionType, TargetMetric};

/// Training load impulse `w(session)` (§4.2). Rest is *not* folded in here
/// — it is already credited via `effective_reps` during normalization, so
/// adding it again would double-count the same recovery signal.
pub fn training_load_impulse(cfg: &Config, exercise: &ExerciseDefinition, session: &SessionResult) -> f64 {
    let s_variant = exercise.variant_stress(&session.variant);
    session
        .sets
        .iter()
        .map(|set| {
            let rir = set.rir.map(|r| r as f64).unwrap_or(0.0);
            let hr = set.reps as f64 * (1.0 + cfg.hr_rir_penalty * (3.0 - rir).max(0.0));
            let l_rel = crate::metrics::l_rel_for_set(exercise, set, session.bodyweight_kg);
            let s_load = l_rel.powf(cfg.load_exponent);
            hr * s_load * s_variant
        })
        .sum()
}

/// Same as `training_load_impulse` but estimates unreported RIR from the
/// current max estimate rather than assuming RIR=0, matching §4.1's
/// `estimate_rir`. Used by the replay loop, which always has an `m_hat` on
/// hand; the simpler form above is kept for tests/documentation of the
/// pure HR_j formula in isolation.
pub fn training_load_impulse_with_max(
    cfg: &Config,
    exercise: &ExerciseDefinition,
    session: &SessionResult,
    m_hat: f64,
) -> f64 {
    let s_variant = exercise.variant_stress(&session.variant);
    session
        .sets
        .iter()
        .map(|set| {
            let rir = set_rir(set, m_hat);
            let hr = set.reps as f64 * (1.0 + cfg.hr_rir_penalty * (3.0 - rir).max(0.0));
            let l_rel = crate::metrics::l_rel_for_set(exercise, set, session.bodyweight_kg);
            let s_load = l_rel.powf(cfg.load_exponent);
            hr * s_load * s_variant
        })
        .sum()
}

/// Apply exponential decay to fitness/fatigue for `delta_days` elapsed,
/// with no training impulse and no readiness-statistic update (§4.2
/// "Rest-day decay").
pub fn decay(cfg: &Config, state: &mut FitnessFatigueState, delta_days: f64) {
    state.fitness *= (-delta_days / cfg.fitness_tau_days).exp();
    state.fatigue *= (-delta_days / cfg.fatigue_tau_days).exp();
}

/// Apply a training session's impulse on top of decay for `delta_days`,
/// then fold the resulting readiness into the running EWMA mean/variance.
pub fn apply_training_session(cfg: &Config, state: &mut FitnessFatigueState, delta_days: f64, impulse: f64) {
    decay(cfg, state, delta_days);
    state.fitness += cfg.fitness_gain * impulse;
    state.fatigue += cfg.fatigue_gain * impulse;

    let r = state.readiness();
    let alpha = cfg.readiness_ewma_alpha;
    if state.update_count == 0 {
        state.readiness_mean = r;
        state.readiness_var = 0.0;
    } else {
        let delta = r - state.readiness_mean;
        state.readiness_mean += alpha * delta;
        state.readiness_var = (1.0 - alpha) * (state.readiness_var + alpha * delta * delta);
    }
    state.update_count += 1;
}

/// EWMA update to the max estimator after an observed TEST result.
pub fn update_max_estimate(cfg: &Config, state: &mut FitnessFatigueState, observed_max: f64) {
    let m_hat_old = state.m_hat;
    state.m_hat = (1.0 - cfg.max_ewma_alpha) * m_hat_old + cfg.max_ewma_alpha * observed_max;
    let sq_err = (observed_max - m_hat_old).powi(2);
    state.sigma_m2 = (1.0 - cfg.max_variance_alpha) * state.sigma_m2 + cfg.max_variance_alpha * sq_err;
}

/// Readiness-adjusted max prediction: `m_hat * (1 + 0.02*(R - R_mean))`.
pub fn readiness_adjusted_prediction(cfg: &Config, state: &FitnessFatigueState) -> f64 {
    state.m_hat * (1.0 + cfg.readiness_pred_sensitivity * (state.readiness() - state.readiness_mean))
}

/// The observed max from a TEST session, per the exercise's target metric.
/// Rep-target exercises use the best single-set rep count; 1RM-target
/// exercises (BSS) estimate a 1RM from the best set via the Epley formula,
/// since a TEST set there is a near-failure loaded set rather than a pure
/// bodyweight max-reps set. This is a resolved open question — spec.md
/// does not specify how a TEST session maps to an OneRmKg observation.
pub fn observed_test_max(exercise: &ExerciseDefinition, session: &SessionResult) -> f64 {
    match exercise.target_metric {
        TargetMetric::MaxReps => session.max_reps() as f64,
        TargetMetric::OneRmKg => session
            .sets
            .iter()
            .map(|s| s.weight_kg * (1.0 + s.reps as f64 / 30.0))
            .fold(0.0, f64::max),
    }
}

/// Replay an exercise's full history in ascending date order and return
/// the terminal fitness-fatigue state. Deterministic and pure over the
/// input slice: callers must pass history pre-sorted by (date, then
/// insertion order) — ties are not reordered here.
pub fn build_state(cfg: &Config, exercise: &ExerciseDefinition, history: &[SessionResult], baseline_max: f64) -> FitnessFatigueState {
    let series = build_state_series(cfg, exercise, history, baseline_max);
    series
        .last()
        .map(|s| s.state_after)
        .unwrap_or_else(|| FitnessFatigueState::new(baseline_max))
}

/// One history record together with the fitness-fatigue state immediately
/// before and immediately after it was folded in. Used by adaptation
/// logic that needs "the prediction as of that session's own date"
/// (underperformance detection, §4.3).
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub session: SessionResult,
    pub state_before: FitnessFatigueState,
    pub state_after: FitnessFatigueState,
}

/// Replay history in ascending date order, recording the state before and
/// after each record. `build_state` is exactly this function's last
/// `state_after` (or the fresh baseline state if history is empty).
pub fn build_state_series(
    cfg: &Config,
    exercise: &ExerciseDefinition,
    history: &[SessionResult],
    baseline_max: f64,
) -> Vec<Snapshot> {
    let mut state = FitnessFatigueState::new(baseline_max);
    let mut sorted: Vec<&SessionResult> = history.iter().collect();
    sorted.sort_by_key(|s| s.date);

    let mut out = Vec::with_capacity(sorted.len());
    for session in sorted {
        let state_before = state;
        let delta_days = match state.last_update {
            Some(last) => (session.date - last).num_days().max(0) as f64,
            None => 0.0,
        };

        if session.session_type == SessionType::Rest {
            decay(cfg, &mut state, delta_days);
        } else {
            let impulse = training_load_impulse_with_max(cfg, exercise, session, state.m_hat);
            apply_training_session(cfg, &mut state, delta_days, impulse);
            if session.session_type == SessionType::Test {
                let observed = observed_test_max(exercise, session);
                update_max_estimate(cfg, &mut state, observed);
            }
        }
        state.last_update = Some(session.date);
        out.push(Snapshot {
            session: session.clone(),
            state_before,
            state_after: state,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::pull_up_definition;
    use crate::models::CompletedSet;
    use chrono::NaiveDate;

    fn set(reps: u32, rir: Option<u8>) -> CompletedSet {
        CompletedSet { reps, weight_kg: 0.0, rest_s: Some(180), rir }
    }

    fn session(date: NaiveDate, session_type: SessionType, sets: Vec<CompletedSet>) -> SessionResult {
        SessionResult {
            date,
            exercise_id: "pull_up".into(),
            session_type,
            variant: "pronated".into(),
            bodyweight_kg: 82.0,
            sets,
            equipment: None,
            planned_sets: None,
            notes: None,
        }
    }

    #[test]
    fn test_build_state_deterministic() {
        let cfg = Config::default();
        let ex = pull_up_definition();
        let history = vec![
            session(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), SessionType::S, vec![set(8, Some(2)); 4]),
            session(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(), SessionType::H, vec![set(6, Some(3)); 5]),
        ];
        let a = build_state(&cfg, &ex, &history, 10.0);
        let b = build_state(&cfg, &ex, &history, 10.0);
        assert_eq!(a.fitness, b.fitness);
        assert_eq!(a.fatigue, b.fatigue);
        assert_eq!(a.m_hat, b.m_hat);
    }

    #[test]
    fn test_build_state_order_independent_input_sorted_internally() {
        let cfg = Config::default();
        let ex = pull_up_definition();
        let mut history = vec![
            session(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(), SessionType::H, vec![set(6, Some(3)); 5]),
            session(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), SessionType::S, vec![set(8, Some(2)); 4]),
        ];
        let a = build_state(&cfg, &ex, &history, 10.0);
        history.reverse();
        let b = build_state(&cfg, &ex, &history, 10.0);
        assert_eq!(a.fitness, b.fitness);
        assert_eq!(a.fatigue, b.fatigue);
    }

    #[test]
    fn test_test_session_sets_training_max() {
        let cfg = Config::default();
        let ex = pull_up_definition();
        let history = vec![session(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            SessionType::Test,
            vec![set(12, None)],
        )];
        let state = build_state(&cfg, &ex, &history, 10.0);
        let tm = crate::metrics::training_max_from(&cfg, state.m_hat);
        // m_hat = 0.75*10 + 0.25*12 = 10.5 -> floor(0.9*10.5) = 9
        assert_eq!(tm, 9);
    }

    #[test]
    fn test_rest_day_decays_without_updating_readiness_stats() {
        let cfg = Config::default();
        let ex = pull_up_definition();
        let history = vec![
            session(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), SessionType::S, vec![set(8, Some(1)); 4]),
            session(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), SessionType::Rest, vec![]),
        ];
        let state = build_state(&cfg, &ex, &history, 10.0);
        assert_eq!(state.update_count, 1);
    }

    #[test]
    fn test_decay_reduces_fitness_and_fatigue() {
        let cfg = Config::default();
        let mut state = FitnessFatigueState::new(10.0);
        state.fitness = 10.0;
        state.fatigue = 10.0;
        decay(&cfg, &mut state, 7.0);
        assert!(state.fitness < 10.0);
        assert!(state.fatigue < state.fitness); // fatigue decays faster (shorter tau)
    }
}
