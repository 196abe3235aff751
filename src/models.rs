//! Core data model: exercises, sessions, plans, timeline entries and the
//! per-exercise fitness-fatigue state.
//!
//! Closed enums are used throughout instead of stringly-typed dispatch —
//! `SessionType` and `Status` are fixed by the domain, while exercise
//! variants ("grips") stay user-extensible strings since new exercises can
//! define their own.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session type. TEST is an all-out max-reps assessment; REST is a rest day
/// inserted only by the shift-forward operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    S,
    H,
    E,
    T,
    #[serde(rename = "TEST")]
    Test,
    #[serde(rename = "REST")]
    Rest,
}

impl SessionType {
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::S => "S",
            SessionType::H => "H",
            SessionType::E => "E",
            SessionType::T => "T",
            SessionType::Test => "TEST",
            SessionType::Rest => "REST",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Timeline entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Done,
    Rested,
    Missed,
    Next,
    Planned,
    Extra,
}

/// How added weight combines with bodyweight for 1RM purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadType {
    BwPlusExternal,
    ExternalOnly,
}

/// What the exercise's progression target is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMetric {
    MaxReps,
    OneRmKg,
}

/// Self-reported sex, used only where a profile field references it;
/// the core never branches planning logic on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// Per session-type prescription parameters (§3 SessionTypeParams).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionTypeParams {
    pub reps_fraction_low: f64,
    pub reps_fraction_high: f64,
    pub reps_min: u32,
    pub reps_max: u32,
    pub sets_min: u32,
    pub sets_max: u32,
    pub rest_min: u32,
    pub rest_max: u32,
    pub rir_target: f64,
}

/// Immutable per-exercise configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub id: String,
    pub display_name: String,
    pub muscle_group: String,
    pub bw_fraction: f64,
    pub load_type: LoadType,
    pub variants: Vec<String>,
    pub primary_variant: String,
    /// Per-variant stress factor, keyed by variant name (≈1.0).
    pub variant_stress_factor: HashMap<String, f64>,
    pub has_variant_rotation: bool,
    /// Ordered variant list used for rotation, keyed by session type.
    pub grip_cycles: HashMap<SessionType, Vec<String>>,
    pub session_params: HashMap<SessionType, SessionTypeParams>,
    pub target_metric: TargetMetric,
    pub target_value: f64,
    pub test_frequency_weeks: u32,
    pub onerm_includes_bodyweight: bool,
    pub weight_increment_fraction: f64,
    /// TM above which added weight kicks in for S sessions. 999 disables it.
    pub weight_tm_threshold: f64,
    pub max_added_weight_kg: f64,
}

impl ExerciseDefinition {
    pub fn variant_stress(&self, variant: &str) -> f64 {
        self.variant_stress_factor.get(variant).copied().unwrap_or(1.0)
    }
}

/// A single completed set as logged by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletedSet {
    pub reps: u32,
    pub weight_kg: f64,
    pub rest_s: Option<u32>,
    pub rir: Option<u8>,
}

/// A single prescribed set, either frozen (from history) or freshly planned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedSet {
    pub reps: u32,
    pub weight_kg: f64,
    pub rest_s: u32,
}

/// A logged training session. `planned_sets`, once written, is never
/// mutated by the engine (invariant 1 in spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub date: NaiveDate,
    pub exercise_id: String,
    pub session_type: SessionType,
    pub variant: String,
    pub bodyweight_kg: f64,
    pub sets: Vec<CompletedSet>,
    #[serde(default)]
    pub equipment: Option<serde_json::Value>,
    #[serde(default)]
    pub planned_sets: Option<Vec<PlannedSet>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SessionResult {
    /// Max reps across sets performed with no added weight, or 0 (§4.1).
    pub fn max_reps(&self) -> u32 {
        self.sets.iter().map(|s| s.reps).max().unwrap_or(0)
    }
}

/// A freshly generated, ephemeral session prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub date: NaiveDate,
    pub exercise_id: String,
    pub session_type: SessionType,
    pub variant: String,
    pub expected_tm: i64,
    pub week_number: u32,
    pub planned_sets: Vec<PlannedSet>,
}

/// A between-test max estimate pair (FI-based, Nuzzo-based), see §4.4.
pub type TrackBEstimate = (f64, f64);

/// One row of the merged timeline (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub session_type: SessionType,
    pub variant: String,
    pub status: Status,
    #[serde(default)]
    pub actual: Option<SessionResult>,
    #[serde(default)]
    pub prescribed: Option<Vec<PlannedSet>>,
    pub expected_tm: i64,
    #[serde(default)]
    pub history_id: Option<u64>,
    #[serde(default)]
    pub track_b_estimate: Option<TrackBEstimate>,
    pub week_number: u32,
}

/// Two-timescale fitness-fatigue state for one exercise, plus the EWMA max
/// estimator and readiness running statistics (§3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessFatigueState {
    pub fitness: f64,
    pub fatigue: f64,
    pub m_hat: f64,
    pub sigma_m2: f64,
    pub readiness_mean: f64,
    pub readiness_var: f64,
    pub update_count: u32,
    pub last_update: Option<NaiveDate>,
}

impl FitnessFatigueState {
    /// Seed a fresh state from a baseline max, before any history replay.
    pub fn new(baseline_max: f64) -> Self {
        FitnessFatigueState {
            fitness: 0.0,
            fatigue: 0.0,
            m_hat: baseline_max,
            sigma_m2: 1.5 * 1.5,
            readiness_mean: 0.0,
            readiness_var: 1.0,
            update_count: 0,
            last_update: None,
        }
    }

    pub fn readiness(&self) -> f64 {
        self.fitness - self.fatigue
    }

    /// z-score of current readiness against its running mean/variance.
    pub fn readiness_z(&self) -> f64 {
        let sd = self.readiness_var.max(1e-9).sqrt();
        (self.readiness() - self.readiness_mean) / sd
    }
}

/// A user's training profile (§3 UserProfile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub height_cm: Option<f64>,
    pub sex: Option<Sex>,
    pub bodyweight_kg: f64,
    pub default_days_per_week: u8,
    #[serde(default)]
    pub exercise_days: HashMap<String, u8>,
    /// Baseline/target max reps per exercise, used when there is no TEST
    /// history yet.
    #[serde(default)]
    pub baseline_max: HashMap<String, f64>,
    #[serde(default)]
    pub target_max_reps: HashMap<String, f64>,
    pub enabled_exercises: Vec<String>,
    #[serde(default)]
    pub plan_start_date: HashMap<String, NaiveDate>,
    #[serde(default)]
    pub rest_preference: Option<i32>,
    #[serde(default)]
    pub injury_notes: Option<String>,
}

impl UserProfile {
    pub fn days_per_week(&self, exercise_id: &str) -> u8 {
        self.exercise_days
            .get(exercise_id)
            .copied()
            .unwrap_or(self.default_days_per_week)
    }
}
