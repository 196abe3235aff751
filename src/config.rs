//! Resolved numeric configuration for the planning engine.
//!
//! `Config` bundles every tunable constant the core formulas reference. It
//! is built once at startup by deep-merging bundled defaults with an
//! optional user TOML overlay (`ConfigOverlay`, all-`Option` mirror of
//! `Config`) and handed to the core by value — no process-wide mutable
//! globals. A malformed overlay degrades to defaults rather than aborting
//! (§7 ConfigDegraded policy); the caller gets a warning string back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single point of the piecewise-linear PCr-recovery / %1RM lookup tables.
pub type CurvePoint = (f64, f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // --- rest_factor / effective_reps (§4.1) ---
    pub rest_factor_min: f64,
    pub rest_factor_max: f64,
    pub rest_factor_ref_s: f64,
    pub rest_factor_exponent: f64,
    pub rest_factor_floor_s: f64,

    // --- fitness-fatigue impulse/decay (§4.2) ---
    pub fitness_tau_days: f64,
    pub fatigue_tau_days: f64,
    pub fitness_gain: f64,
    pub fatigue_gain: f64,
    pub hr_rir_penalty: f64,
    pub load_exponent: f64,

    // --- readiness running statistics ---
    pub readiness_ewma_alpha: f64,

    // --- EWMA max estimator ---
    pub max_ewma_alpha: f64,
    pub max_variance_alpha: f64,
    pub max_sigma0: f64,
    pub readiness_pred_sensitivity: f64,

    // --- training max ---
    pub training_max_factor: f64,

    // --- adaptation (§4.3) ---
    pub plateau_slope_threshold: f64,
    pub plateau_window_days: i64,
    pub deload_readiness_z: f64,
    pub deload_compliance_threshold: f64,
    pub underperformance_factor: f64,
    pub autoregulate_gate_sessions: u32,
    pub autoregulate_low_z: f64,
    pub autoregulate_high_z: f64,
    pub autoregulate_set_factor: f64,
    pub autoregulate_min_sets: u32,
    pub autoregulate_rep_bonus: u32,
    pub progression_base: f64,
    pub progression_max: f64,
    pub progression_exponent: f64,
    pub volume_deload_factor: f64,
    pub volume_low_z_factor: f64,
    pub volume_high_z_factor: f64,
    pub volume_high_compliance_threshold: f64,
    pub volume_floor: u32,
    pub volume_cap: u32,

    // --- overtraining (§4.3) ---
    pub overtraining_window_days: i64,
    pub overtraining_rest_add_s: f64,

    // --- adaptive rest adjustments (§4.5 step 6i) ---
    pub rest_low_rir_add_s: f64,
    pub rest_high_dropoff_add_s: f64,
    pub rest_high_rir_sub_s: f64,
    pub rest_low_readiness_add_s: f64,
    pub dropoff_high_threshold: f64,

    // --- added weight ---
    pub weight_round_kg: f64,

    // --- max estimator (§4.4) ---
    pub fi_target: f64,
    pub fi_reserve_gain: f64,
    pub default_rest_assumption_s: f64,
    pub pcr_recovery_table: Vec<CurvePoint>,
    pub nuzzo_pct_1rm_table: Vec<CurvePoint>,

    // --- trend ---
    pub trend_window_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rest_factor_min: 0.80,
            rest_factor_max: 1.05,
            rest_factor_ref_s: 180.0,
            rest_factor_exponent: 0.20,
            rest_factor_floor_s: 30.0,

            fitness_tau_days: 42.0,
            fatigue_tau_days: 7.0,
            fitness_gain: 0.5,
            fatigue_gain: 1.0,
            hr_rir_penalty: 0.15,
            load_exponent: 1.5,

            readiness_ewma_alpha: 0.1,

            max_ewma_alpha: 0.25,
            max_variance_alpha: 0.15,
            max_sigma0: 1.5,
            readiness_pred_sensitivity: 0.02,

            training_max_factor: 0.9,

            plateau_slope_threshold: 0.05,
            plateau_window_days: 21,
            deload_readiness_z: -0.5,
            deload_compliance_threshold: 0.70,
            underperformance_factor: 0.90,
            autoregulate_gate_sessions: 10,
            autoregulate_low_z: -1.0,
            autoregulate_high_z: 1.0,
            autoregulate_set_factor: 0.70,
            autoregulate_min_sets: 3,
            autoregulate_rep_bonus: 1,
            progression_base: 0.3,
            progression_max: 1.0,
            progression_exponent: 1.5,
            volume_deload_factor: 0.60,
            volume_low_z_factor: 0.70,
            volume_high_z_factor: 1.10,
            volume_high_compliance_threshold: 0.90,
            volume_floor: 8,
            volume_cap: 20,

            overtraining_window_days: 7,
            overtraining_rest_add_s: 30.0,

            rest_low_rir_add_s: 30.0,
            rest_high_dropoff_add_s: 15.0,
            rest_high_rir_sub_s: 15.0,
            rest_low_readiness_add_s: 30.0,
            dropoff_high_threshold: 0.35,

            weight_round_kg: 0.5,

            fi_target: 0.35,
            fi_reserve_gain: 0.6,
            default_rest_assumption_s: 180.0,
            pcr_recovery_table: vec![
                (0.0, 0.00),
                (10.0, 0.25),
                (30.0, 0.50),
                (60.0, 0.75),
                (90.0, 0.87),
                (120.0, 0.93),
                (180.0, 0.97),
                (240.0, 0.99),
                (300.0, 1.00),
            ],
            nuzzo_pct_1rm_table: vec![
                (1.0, 1.00),
                (3.0, 0.95),
                (5.3, 0.90),
                (7.7, 0.85),
                (11.0, 0.80),
                (13.4, 0.75),
                (17.0, 0.70),
                (21.0, 0.65),
                (25.0, 0.60),
                (29.7, 0.55),
                (35.0, 0.50),
            ],

            trend_window_days: 21,
        }
    }
}

/// All-optional mirror of `Config` used to parse a partial user overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverlay {
    pub rest_factor_min: Option<f64>,
    pub rest_factor_max: Option<f64>,
    pub fitness_tau_days: Option<f64>,
    pub fatigue_tau_days: Option<f64>,
    pub max_ewma_alpha: Option<f64>,
    pub max_variance_alpha: Option<f64>,
    pub training_max_factor: Option<f64>,
    pub plateau_slope_threshold: Option<f64>,
    pub deload_compliance_threshold: Option<f64>,
    pub autoregulate_gate_sessions: Option<u32>,
    pub progression_base: Option<f64>,
    pub progression_max: Option<f64>,
    pub volume_floor: Option<u32>,
    pub volume_cap: Option<u32>,
    pub weight_round_kg: Option<f64>,
}

impl Config {
    fn apply_overlay(mut self, overlay: ConfigOverlay) -> Config {
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = overlay.$field {
                    self.$field = v;
                }
            };
        }
        take!(rest_factor_min);
        take!(rest_factor_max);
        take!(fitness_tau_days);
        take!(fatigue_tau_days);
        take!(max_ewma_alpha);
        take!(max_variance_alpha);
        take!(training_max_factor);
        take!(plateau_slope_threshold);
        take!(deload_compliance_threshold);
        take!(autoregulate_gate_sessions);
        take!(progression_base);
        take!(progression_max);
        take!(volume_floor);
        take!(volume_cap);
        take!(weight_round_kg);
        self
    }

    /// Resolve the config bundled defaults deep-merged with an optional
    /// user TOML file. Returns the resolved config plus a warning string
    /// if the overlay existed but failed to parse (ConfigDegraded).
    pub fn resolve(overlay_path: Option<&Path>) -> (Config, Option<String>) {
        let base = Config::default();
        let Some(path) = overlay_path else {
            return (base, None);
        };
        if !path.exists() {
            return (base, None);
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<ConfigOverlay>(&content) {
                Ok(overlay) => (base.apply_overlay(overlay), None),
                Err(e) => (
                    base,
                    Some(format!(
                        "failed to parse config overlay {}: {} — using bundled defaults",
                        path.display(),
                        e
                    )),
                ),
            },
            Err(e) => (
                base,
                Some(format!(
                    "failed to read config overlay {}: {} — using bundled defaults",
                    path.display(),
                    e
                )),
            ),
        }
    }

    /// Default location for the user config overlay.
    pub fn default_overlay_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".barcoach")
            .join("config.toml")
    }

    /// Piecewise-linear interpolation over an (x, y) table sorted by x.
    /// Clamps to the table's boundary values outside its domain.
    pub fn interpolate(table: &[CurvePoint], x: f64) -> f64 {
        if table.is_empty() {
            return 0.0;
        }
        if x <= table[0].0 {
            return table[0].1;
        }
        if x >= table[table.len() - 1].0 {
            return table[table.len() - 1].1;
        }
        for w in table.windows(2) {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            if x >= x0 && x <= x1 {
                let t = (x - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        table[table.len() - 1].1
    }

    /// Inverse lookup: given a y value, find the x whose table entry maps
    /// closest to it via linear interpolation on the same curve. Used for
    /// the Nuzzo table, which is indexed by reps and interpolated for
    /// %1RM, but needs to be read the other way when given a rep count
    /// directly (the table here is already reps->pct so a direct lookup
    /// via `interpolate` is what's needed; this helper exists for
    /// clarity at call sites that think in "inverse" terms).
    pub fn lookup_pct_1rm(&self, reps: f64) -> f64 {
        Self::interpolate(&self.nuzzo_pct_1rm_table, reps)
    }

    pub fn lookup_pcr_recovery(&self, rest_s: f64) -> f64 {
        Self::interpolate(&self.pcr_recovery_table, rest_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_spec_constants() {
        let c = Config::default();
        assert_eq!(c.fitness_tau_days, 42.0);
        assert_eq!(c.fatigue_tau_days, 7.0);
        assert_eq!(c.training_max_factor, 0.9);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let table = vec![(0.0, 0.0), (10.0, 1.0)];
        assert!((Config::interpolate(&table, 5.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_clamps_outside_domain() {
        let table = vec![(0.0, 0.0), (10.0, 1.0)];
        assert_eq!(Config::interpolate(&table, -5.0), 0.0);
        assert_eq!(Config::interpolate(&table, 50.0), 1.0);
    }

    #[test]
    fn test_overlay_merges_only_present_keys() {
        let base = Config::default();
        let overlay = ConfigOverlay {
            fitness_tau_days: Some(30.0),
            ..Default::default()
        };
        let merged = base.clone().apply_overlay(overlay);
        assert_eq!(merged.fitness_tau_days, 30.0);
        assert_eq!(merged.fatigue_tau_days, base.fatigue_tau_days);
    }

    #[test]
    fn test_resolve_missing_file_uses_defaults() {
        let (cfg, warning) = Config::resolve(Some(Path::new("/nonexistent/path.toml")));
        assert_eq!(cfg, Config::default());
        assert!(warning.is_none());
    }

    #[test]
    fn test_resolve_malformed_overlay_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml {{{").unwrap();
        let (cfg, warning) = Config::resolve(Some(&path));
        assert_eq!(cfg, Config::default());
        assert!(warning.is_some());
    }
}
