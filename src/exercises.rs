//! Built-in `ExerciseDefinition`s for the three supported bodyweight
//! exercises. Static tables in the style of `ThresholdEstimator`'s
//! reference constants — the core never prescribes an exercise outside
//! this set (§1 Non-goals).

use crate::error::{BarcoachError, Result};
use crate::models::{ExerciseDefinition, LoadType, SessionType, SessionTypeParams, TargetMetric};
use std::collections::HashMap;

fn params(
    reps_fraction_low: f64,
    reps_fraction_high: f64,
    reps_min: u32,
    reps_max: u32,
    sets_min: u32,
    sets_max: u32,
    rest_min: u32,
    rest_max: u32,
    rir_target: f64,
) -> SessionTypeParams {
    SessionTypeParams {
        reps_fraction_low,
        reps_fraction_high,
        reps_min,
        reps_max,
        sets_min,
        sets_max,
        rest_min,
        rest_max,
        rir_target,
    }
}

fn bodyweight_session_params() -> HashMap<SessionType, SessionTypeParams> {
    let mut m = HashMap::new();
    m.insert(SessionType::S, params(0.3, 0.7, 3, 12, 3, 5, 180, 300, 1.5));
    m.insert(SessionType::H, params(0.7, 0.7, 5, 15, 5, 5, 150, 150, 2.0));
    m.insert(SessionType::E, params(0.3, 0.5, 3, 20, 4, 8, 60, 90, 3.0));
    m.insert(SessionType::T, params(0.3, 0.5, 3, 10, 3, 5, 90, 120, 3.0));
    m
}

/// Pull-up: bw_fraction 1.0, three grip variants rotating on a fixed cycle.
pub fn pull_up_definition() -> ExerciseDefinition {
    let mut variant_stress_factor = HashMap::new();
    variant_stress_factor.insert("pronated".to_string(), 1.00);
    variant_stress_factor.insert("neutral".to_string(), 0.95);
    variant_stress_factor.insert("supinated".to_string(), 1.05);

    let cycle = vec!["pronated".to_string(), "neutral".to_string(), "supinated".to_string()];
    let mut grip_cycles = HashMap::new();
    grip_cycles.insert(SessionType::S, cycle.clone());
    grip_cycles.insert(SessionType::H, cycle.clone());
    grip_cycles.insert(SessionType::E, vec!["pronated".to_string()]);
    grip_cycles.insert(SessionType::T, cycle);
    grip_cycles.insert(SessionType::Test, vec!["pronated".to_string()]);

    ExerciseDefinition {
        id: "pull_up".to_string(),
        display_name: "Pull-up".to_string(),
        muscle_group: "back".to_string(),
        bw_fraction: 1.0,
        load_type: LoadType::BwPlusExternal,
        variants: vec!["pronated".to_string(), "neutral".to_string(), "supinated".to_string()],
        primary_variant: "pronated".to_string(),
        variant_stress_factor,
        has_variant_rotation: true,
        grip_cycles,
        session_params: bodyweight_session_params(),
        target_metric: TargetMetric::MaxReps,
        target_value: 20.0,
        test_frequency_weeks: 3,
        onerm_includes_bodyweight: true,
        weight_increment_fraction: 0.01,
        weight_tm_threshold: 9.0,
        max_added_weight_kg: 40.0,
    }
}

/// Parallel-bar dip: bw_fraction 0.92, lean-angle variants.
pub fn dip_definition() -> ExerciseDefinition {
    let mut variant_stress_factor = HashMap::new();
    variant_stress_factor.insert("upright".to_string(), 1.00);
    variant_stress_factor.insert("forward_lean".to_string(), 1.05);
    variant_stress_factor.insert("ring".to_string(), 0.97);

    let cycle = vec!["upright".to_string(), "forward_lean".to_string(), "ring".to_string()];
    let mut grip_cycles = HashMap::new();
    grip_cycles.insert(SessionType::S, cycle.clone());
    grip_cycles.insert(SessionType::H, cycle.clone());
    grip_cycles.insert(SessionType::E, vec!["upright".to_string()]);
    grip_cycles.insert(SessionType::T, cycle);
    grip_cycles.insert(SessionType::Test, vec!["upright".to_string()]);

    ExerciseDefinition {
        id: "dip".to_string(),
        display_name: "Parallel-Bar Dip".to_string(),
        muscle_group: "chest_triceps".to_string(),
        bw_fraction: 0.92,
        load_type: LoadType::BwPlusExternal,
        variants: vec!["upright".to_string(), "forward_lean".to_string(), "ring".to_string()],
        primary_variant: "upright".to_string(),
        variant_stress_factor,
        has_variant_rotation: true,
        grip_cycles,
        session_params: bodyweight_session_params(),
        target_metric: TargetMetric::MaxReps,
        target_value: 25.0,
        test_frequency_weeks: 3,
        onerm_includes_bodyweight: true,
        weight_increment_fraction: 0.012,
        weight_tm_threshold: 10.0,
        max_added_weight_kg: 45.0,
    }
}

/// Bulgarian split squat: external-weight-only load, 1RM target, legs as
/// the rotating "grip" (alternating which leg leads).
pub fn bss_definition() -> ExerciseDefinition {
    let mut variant_stress_factor = HashMap::new();
    variant_stress_factor.insert("left".to_string(), 1.00);
    variant_stress_factor.insert("right".to_string(), 1.00);

    let cycle = vec!["left".to_string(), "right".to_string()];
    let mut grip_cycles = HashMap::new();
    grip_cycles.insert(SessionType::S, cycle.clone());
    grip_cycles.insert(SessionType::H, cycle.clone());
    grip_cycles.insert(SessionType::E, cycle.clone());
    grip_cycles.insert(SessionType::T, cycle.clone());
    grip_cycles.insert(SessionType::Test, cycle);

    let mut session_params = HashMap::new();
    session_params.insert(SessionType::S, params(0.3, 0.7, 3, 10, 3, 5, 180, 300, 1.5));
    session_params.insert(SessionType::H, params(0.6, 0.6, 6, 15, 4, 5, 120, 120, 2.0));
    session_params.insert(SessionType::E, params(0.4, 0.6, 8, 20, 3, 6, 60, 90, 3.0));
    session_params.insert(SessionType::T, params(0.3, 0.5, 3, 10, 3, 5, 90, 120, 3.0));

    ExerciseDefinition {
        id: "bss".to_string(),
        display_name: "Bulgarian Split Squat".to_string(),
        muscle_group: "legs".to_string(),
        bw_fraction: 0.71,
        load_type: LoadType::ExternalOnly,
        variants: vec!["left".to_string(), "right".to_string()],
        primary_variant: "left".to_string(),
        variant_stress_factor,
        has_variant_rotation: true,
        grip_cycles,
        session_params,
        target_metric: TargetMetric::OneRmKg,
        target_value: 60.0,
        test_frequency_weeks: 4,
        onerm_includes_bodyweight: false,
        weight_increment_fraction: 0.02,
        weight_tm_threshold: 999.0,
        max_added_weight_kg: 100.0,
    }
}

/// Look up a built-in exercise definition by id.
pub fn get_exercise(id: &str) -> Result<ExerciseDefinition> {
    match id {
        "pull_up" => Ok(pull_up_definition()),
        "dip" => Ok(dip_definition()),
        "bss" => Ok(bss_definition()),
        other => Err(BarcoachError::InvalidInput(format!("unknown exercise id: {}", other))),
    }
}

pub fn all_exercise_ids() -> Vec<&'static str> {
    vec!["pull_up", "dip", "bss"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_exercise_known_ids() {
        assert!(get_exercise("pull_up").is_ok());
        assert!(get_exercise("dip").is_ok());
        assert!(get_exercise("bss").is_ok());
    }

    #[test]
    fn test_get_exercise_unknown_id_errors() {
        assert!(get_exercise("bench_press").is_err());
    }

    #[test]
    fn test_bss_weight_threshold_disabled() {
        let bss = bss_definition();
        assert_eq!(bss.weight_tm_threshold, 999.0);
        assert_eq!(bss.load_type, LoadType::ExternalOnly);
    }

    #[test]
    fn test_pull_up_rotation_cycle_length_three() {
        let pu = pull_up_definition();
        assert_eq!(pu.grip_cycles[&SessionType::S].len(), 3);
        assert_eq!(pu.grip_cycles[&SessionType::Test].len(), 1);
    }
}
