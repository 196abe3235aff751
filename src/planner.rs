//! The core planning algorithm (§4.5): resumes rotation and variant state
//! from history, ramps a training max week over week, and materializes a
//! horizon of prescribed sessions. Grounded on `TrainingPlanGenerator` in
//! style (a stateless generator walking a template), though the domain
//! here drives everything off the replayed fitness-fatigue state rather
//! than a fixed periodization model.

use crate::adaptation::{autoregulate, overtraining_severity, progression_rate};
use crate::config::Config;
use crate::error::Result;
use crate::metrics::drop_off;
use crate::models::{ExerciseDefinition, PlannedSet, SessionPlan, SessionResult, SessionType, UserProfile};
use crate::physiology::{build_state_series, observed_test_max};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

fn schedule_template(days_per_week: u8) -> &'static [SessionType] {
    use SessionType::*;
    match days_per_week {
        0 | 1 => &[S],
        2 => &[S, H],
        3 => &[S, H, E],
        4 => &[S, H, T, E],
        _ => &[S, H, T, E, S],
    }
}

fn day_offsets(days_per_week: u8) -> &'static [i64] {
    match days_per_week {
        0 | 1 => &[0],
        2 => &[0, 3],
        3 => &[0, 2, 4],
        4 => &[0, 1, 3, 5],
        _ => &[0, 1, 2, 4, 5],
    }
}

fn monday_on_or_before(date: NaiveDate) -> NaiveDate {
    let weekday = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(weekday)
}

fn week_number(first_monday: NaiveDate, date: NaiveDate) -> u32 {
    (((date - first_monday).num_days() / 7) + 1).max(1) as u32
}

/// Seed a per-session-type rotation counter from how many past sessions of
/// each type already happened for this exercise (§4.5 step 5).
fn seed_variant_counters(history: &[SessionResult]) -> HashMap<SessionType, usize> {
    let mut counters = HashMap::new();
    for session in history {
        *counters.entry(session.session_type).or_insert(0) += 1;
    }
    counters
}

fn next_variant(exercise: &ExerciseDefinition, session_type: SessionType, counters: &mut HashMap<SessionType, usize>) -> String {
    match exercise.grip_cycles.get(&session_type) {
        Some(cycle) if !cycle.is_empty() && exercise.has_variant_rotation => {
            let i = counters.entry(session_type).or_insert(0);
            let variant = cycle[*i % cycle.len()].clone();
            *i += 1;
            variant
        }
        _ => exercise.primary_variant.clone(),
    }
}

/// One scheduled (date, base session type) slot before prescription and
/// before TEST insertion may replace its type.
#[derive(Debug, Clone)]
struct Slot {
    date: NaiveDate,
    session_type: SessionType,
}

fn generate_slots(plan_start: NaiveDate, horizon_weeks: u32, days_per_week: u8, resume_index: usize) -> Vec<Slot> {
    let template = schedule_template(days_per_week);
    let offsets = day_offsets(days_per_week);
    let len = template.len();
    let mut out = Vec::with_capacity(horizon_weeks as usize * len);
    for w in 0..horizon_weeks as i64 {
        for (k, &offset) in offsets.iter().enumerate() {
            let session_type = template[(resume_index + k) % len];
            let date = plan_start + Duration::days(7 * w + offset);
            out.push(Slot { date, session_type });
        }
    }
    out
}

fn base_reps_range(tm: i64, p: &crate::models::SessionTypeParams) -> (u32, u32) {
    let low = (p.reps_min).max((tm as f64 * p.reps_fraction_low).floor() as u32);
    let high = (p.reps_max).min((tm as f64 * p.reps_fraction_high).floor() as u32);
    (low, high.max(low))
}

/// Descending rep ladder for E sessions: start at `base_reps`, decrease
/// toward (but never below) 3 reps per set, until `total_target` reps are
/// accumulated or `sets_max` sets have been emitted.
fn endurance_ladder(base_reps: u32, total_target: u32, sets_max: u32) -> Vec<u32> {
    let mut ladder = Vec::new();
    let mut accumulated = 0u32;
    let mut reps = base_reps.max(3);
    while accumulated < total_target && (ladder.len() as u32) < sets_max {
        ladder.push(reps);
        accumulated += reps;
        reps = (reps.saturating_sub(1)).max(3);
    }
    if ladder.is_empty() {
        ladder.push(base_reps.max(3));
    }
    ladder
}

fn added_weight_for(
    cfg: &Config,
    exercise: &ExerciseDefinition,
    session_type: SessionType,
    tm: i64,
    profile: &UserProfile,
    history: &[SessionResult],
) -> f64 {
    if exercise.load_type == crate::models::LoadType::ExternalOnly {
        return history
            .iter()
            .filter(|s| s.session_type == SessionType::Test)
            .max_by_key(|s| s.date)
            .and_then(|s| s.sets.iter().map(|set| set.weight_kg).fold(None, |acc, w| Some(acc.map_or(w, |a: f64| a.max(w)))))
            .unwrap_or(0.0);
    }
    if session_type != SessionType::S || (tm as f64) <= exercise.weight_tm_threshold {
        return 0.0;
    }
    let raw = profile.bodyweight_kg * exercise.weight_increment_fraction * (tm as f64 - exercise.weight_tm_threshold);
    let rounded = (raw / cfg.weight_round_kg).round() * cfg.weight_round_kg;
    rounded.min(exercise.max_added_weight_kg).max(0.0)
}

fn adaptive_rest(
    cfg: &Config,
    p: &crate::models::SessionTypeParams,
    session_type: SessionType,
    history: &[SessionResult],
    readiness_z: f64,
    overtraining_level: u8,
) -> u32 {
    let mut rest = (p.rest_min + p.rest_max) as f64 / 2.0;

    if let Some(last) = history.iter().filter(|s| s.session_type == session_type).max_by_key(|s| s.date) {
        if last.sets.iter().any(|s| s.rir.map(|r| r <= 1).unwrap_or(false)) {
            rest += cfg.rest_low_rir_add_s;
        }
        if drop_off(last) > cfg.dropoff_high_threshold {
            rest += cfg.rest_high_dropoff_add_s;
        }
        if !last.sets.is_empty() && last.sets.iter().all(|s| s.rir.map(|r| r >= 3).unwrap_or(false)) {
            rest -= cfg.rest_high_rir_sub_s;
        }
        if readiness_z < -1.0 {
            rest += cfg.rest_low_readiness_add_s;
        }
    }
    rest = rest.clamp(p.rest_min as f64, p.rest_max as f64);

    if overtraining_level >= 1 {
        rest = (rest + cfg.overtraining_rest_add_s).clamp(p.rest_min as f64, p.rest_max as f64);
    }
    rest.round() as u32
}

/// Generate a horizon of `SessionPlan`s for `exercise`, given the user's
/// full history for it and a plan_start anchor (already advanced for any
/// overtraining shift by the caller, or computed here).
pub fn plan(
    cfg: &Config,
    profile: &UserProfile,
    exercise: &ExerciseDefinition,
    history: &[SessionResult],
    baseline_max: f64,
    plan_start: NaiveDate,
    horizon_weeks: u32,
    today: NaiveDate,
) -> Result<Vec<SessionPlan>> {
    let exercise_history: Vec<SessionResult> = history.iter().filter(|s| s.exercise_id == exercise.id).cloned().collect();
    let training_history: Vec<SessionResult> = exercise_history
        .iter()
        .filter(|s| s.session_type != SessionType::Rest)
        .cloned()
        .collect();

    // Step 1: tm_float starting point.
    let latest_test = training_history
        .iter()
        .filter(|s| s.session_type == SessionType::Test)
        .max_by_key(|s| s.date)
        .map(|s| observed_test_max(exercise, s));
    let mut tm_float = latest_test.unwrap_or(baseline_max);

    // Step 2: overtraining shift (in-memory only).
    let days_per_week = profile.days_per_week(&exercise.id);
    let severity = overtraining_severity(cfg, &exercise_history, days_per_week, today);
    let plan_start = plan_start + Duration::days(severity.extra_rest_days);

    // Readiness state for autoregulation/rest adjustments.
    let series = build_state_series(cfg, exercise, &training_history, baseline_max);
    let readiness_z = series.last().map(|s| s.state_after.readiness_z()).unwrap_or(0.0);
    let non_test_count = training_history.iter().filter(|s| s.session_type != SessionType::Test).count() as u32;

    // Step 3/4: template + resume index.
    let template = schedule_template(days_per_week);
    let resume_index = (non_test_count as usize) % template.len();

    let mut slots = generate_slots(plan_start, horizon_weeks, days_per_week, resume_index);
    insert_tests(&mut slots, exercise, &training_history, plan_start);

    let first_monday = exercise_history
        .iter()
        .filter(|s| s.session_type != SessionType::Rest)
        .map(|s| s.date)
        .min()
        .map(monday_on_or_before)
        .unwrap_or_else(|| monday_on_or_before(plan_start));

    let mut variant_counters = seed_variant_counters(&training_history);
    let mut last_week: Option<u32> = None;
    let mut out = Vec::with_capacity(slots.len());

    for slot in slots {
        let wn = week_number(first_monday, slot.date);
        if let Some(lw) = last_week {
            if wn != lw {
                tm_float += progression_rate(cfg, tm_float.round(), exercise.target_value);
            }
        }
        last_week = Some(wn);

        let tm = tm_float.round() as i64;
        let variant = match slot.session_type {
            SessionType::Test => exercise.primary_variant.clone(),
            t => next_variant(exercise, t, &mut variant_counters),
        };

        let planned_sets = if slot.session_type == SessionType::Test {
            let weight = added_weight_for(cfg, exercise, slot.session_type, tm, profile, &training_history);
            vec![PlannedSet { reps: 0, weight_kg: weight, rest_s: 300 }]
        } else {
            let p = exercise
                .session_params
                .get(&slot.session_type)
                .cloned()
                .unwrap_or(crate::models::SessionTypeParams {
                    reps_fraction_low: 0.3,
                    reps_fraction_high: 0.7,
                    reps_min: 3,
                    reps_max: 12,
                    sets_min: 3,
                    sets_max: 5,
                    rest_min: 90,
                    rest_max: 180,
                    rir_target: 2.0,
                });

            let (low, high) = base_reps_range(tm, &p);
            let base_reps = (low + high) / 2;
            let base_sets = (p.sets_min + p.sets_max) / 2;

            let (sets_n, reps_n) = autoregulate(cfg, non_test_count, readiness_z, base_sets, base_reps);
            let weight = added_weight_for(cfg, exercise, slot.session_type, tm, profile, &training_history);
            let rest = adaptive_rest(cfg, &p, slot.session_type, &training_history, readiness_z, severity.level);

            if slot.session_type == SessionType::E {
                let k_e = 3.0 + 2.0 * ((tm as f64 - 5.0) / 25.0).clamp(0.0, 1.0);
                let total_target = (k_e * tm as f64) as u32;
                let ladder = endurance_ladder(reps_n, total_target, p.sets_max.min(sets_n.max(1)));
                ladder
                    .into_iter()
                    .map(|reps| PlannedSet { reps, weight_kg: weight, rest_s: rest })
                    .collect()
            } else {
                (0..sets_n).map(|_| PlannedSet { reps: reps_n, weight_kg: weight, rest_s: rest }).collect()
            }
        };

        out.push(SessionPlan {
            date: slot.date,
            exercise_id: exercise.id.clone(),
            session_type: slot.session_type,
            variant,
            expected_tm: tm_float.round() as i64,
            week_number: wn,
            planned_sets,
        });
    }

    Ok(out)
}

/// Insert TEST sessions on the appropriate cadence, replacing the first
/// eligible slot at or after each due date (§4.5 step 7). TEST insertion
/// never advances the S/H/E/T rotation — the type substitution happens
/// after slots (and their rotation-derived types) are already assigned.
fn insert_tests(slots: &mut [Slot], exercise: &ExerciseDefinition, history: &[SessionResult], plan_start: NaiveDate) {
    let interval = Duration::days(exercise.test_frequency_weeks as i64 * 7);
    let mut last_test = history
        .iter()
        .filter(|s| s.session_type == SessionType::Test)
        .map(|s| s.date)
        .max()
        .unwrap_or(plan_start);

    loop {
        let due = last_test + interval;
        let Some(slot) = slots.iter_mut().find(|s| s.date >= due && s.session_type != SessionType::Test) else {
            break;
        };
        slot.session_type = SessionType::Test;
        last_test = slot.date;
    }
}

/// Apply the shift-forward operator (§4.5 step 8) to a history slice,
/// returning the records to append (for `shift_days > 0`) or the ids/dates
/// to remove (for `shift_days < 0`), plus the new plan_start anchor. This
/// function does not itself perform storage I/O; the caller (storage.rs /
/// CLI) applies the returned diff.
pub struct ShiftResult {
    pub rest_records_to_add: Vec<SessionResult>,
    pub dates_to_remove: Vec<NaiveDate>,
    pub new_plan_start: NaiveDate,
}

pub fn shift_forward(exercise_id: &str, history: &[SessionResult], from_date: NaiveDate, shift_days: i64) -> ShiftResult {
    if shift_days > 0 {
        let mut rest_records_to_add = Vec::new();
        for d in 0..shift_days {
            let date = from_date + Duration::days(d);
            rest_records_to_add.push(SessionResult {
                date,
                exercise_id: exercise_id.to_string(),
                session_type: SessionType::Rest,
                variant: String::new(),
                bodyweight_kg: 0.0,
                sets: Vec::new(),
                equipment: None,
                planned_sets: None,
                notes: None,
            });
        }
        let last_rest_date = from_date + Duration::days(shift_days - 1);
        ShiftResult {
            rest_records_to_add,
            dates_to_remove: Vec::new(),
            new_plan_start: last_rest_date + Duration::days(1),
        }
    } else if shift_days < 0 {
        let range_start = from_date + Duration::days(shift_days);
        let dates_to_remove: Vec<NaiveDate> = history
            .iter()
            .filter(|s| s.session_type == SessionType::Rest && s.date >= range_start && s.date < from_date)
            .map(|s| s.date)
            .collect();
        let first_training_date = history
            .iter()
            .filter(|s| s.session_type != SessionType::Rest)
            .map(|s| s.date)
            .min()
            .unwrap_or(range_start);
        ShiftResult {
            rest_records_to_add: Vec::new(),
            dates_to_remove,
            new_plan_start: range_start.max(first_training_date),
        }
    } else {
        ShiftResult {
            rest_records_to_add: Vec::new(),
            dates_to_remove: Vec::new(),
            new_plan_start: from_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::pull_up_definition;
    use std::collections::HashMap as Map;

    fn profile() -> UserProfile {
        UserProfile {
            height_cm: None,
            sex: None,
            bodyweight_kg: 82.0,
            default_days_per_week: 3,
            exercise_days: Map::new(),
            baseline_max: Map::new(),
            target_max_reps: Map::new(),
            enabled_exercises: vec!["pull_up".into()],
            plan_start_date: Map::new(),
            rest_preference: None,
            injury_notes: None,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_plan_fresh_user_generates_full_horizon() {
        let cfg = Config::default();
        let ex = pull_up_definition();
        let p = profile();
        let plans = plan(&cfg, &p, &ex, &[], 10.0, d(2026, 1, 5), 3, d(2026, 1, 5)).unwrap();
        // 3 days/week template, 3 weeks -> 9 slots
        assert_eq!(plans.len(), 9);
        assert_eq!(plans[0].session_type, SessionType::S);
    }

    #[test]
    fn test_plan_inserts_test_on_cadence() {
        let cfg = Config::default();
        let ex = pull_up_definition(); // test_frequency_weeks = 3
        let p = profile();
        let plans = plan(&cfg, &p, &ex, &[], 10.0, d(2026, 1, 5), 4, d(2026, 1, 5)).unwrap();
        assert!(plans.iter().any(|sp| sp.session_type == SessionType::Test));
    }

    #[test]
    fn test_shift_forward_positive_adds_rest_records() {
        let result = shift_forward("pull_up", &[], d(2026, 1, 10), 3);
        assert_eq!(result.rest_records_to_add.len(), 3);
        assert_eq!(result.new_plan_start, d(2026, 1, 13));
    }

    #[test]
    fn test_shift_forward_negative_removes_only_rest_in_range() {
        let history = vec![
            SessionResult {
                date: d(2026, 1, 8),
                exercise_id: "pull_up".into(),
                session_type: SessionType::Rest,
                variant: String::new(),
                bodyweight_kg: 0.0,
                sets: vec![],
                equipment: None,
                planned_sets: None,
                notes: None,
            },
            SessionResult {
                date: d(2026, 1, 5),
                exercise_id: "pull_up".into(),
                session_type: SessionType::S,
                variant: "pronated".into(),
                bodyweight_kg: 82.0,
                sets: vec![],
                equipment: None,
                planned_sets: None,
                notes: None,
            },
        ];
        let result = shift_forward("pull_up", &history, d(2026, 1, 10), -3);
        assert_eq!(result.dates_to_remove, vec![d(2026, 1, 8)]);
        assert_eq!(result.new_plan_start, d(2026, 1, 7));
    }

    #[test]
    fn test_endurance_ladder_descends_but_floors_at_three() {
        let ladder = endurance_ladder(8, 40, 8);
        assert!(ladder.iter().all(|&r| r >= 3));
        assert!(ladder.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_added_weight_disabled_below_threshold() {
        let cfg = Config::default();
        let ex = pull_up_definition();
        let p = profile();
        let w = added_weight_for(&cfg, &ex, SessionType::S, 8, &p, &[]);
        assert_eq!(w, 0.0);
    }
}
