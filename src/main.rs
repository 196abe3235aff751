use anyhow::{anyhow, Context, Result};
use barcoach::adaptation::compute_status;
use barcoach::config::Config;
use barcoach::error::BarcoachError;
use barcoach::exercises::{all_exercise_ids, get_exercise};
use barcoach::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use barcoach::metrics::{compliance, sum_actual_reps};
use barcoach::models::{CompletedSet, ExerciseDefinition, SessionResult, SessionType, TargetMetric, UserProfile};
use barcoach::physiology::{build_state_series, observed_test_max};
use barcoach::planner::{plan as generate_plan, shift_forward};
use barcoach::storage::{HistoryStore, ProfileStore};
use barcoach::timeline::{build_timeline, future_max_projection};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::{Table, Tabled};

/// barcoach - adaptive bodyweight strength planning.
///
/// Plans and tracks pull-up, dip, and Bulgarian split squat progression
/// from a replayed fitness-fatigue model, with no external services.
#[derive(Parser)]
#[command(name = "barcoach")]
#[command(author = "barcoach contributors")]
#[command(version = "0.1.0")]
#[command(about = "Adaptive bodyweight strength planner", long_about = None)]
struct Cli {
    /// Exercise to operate on.
    #[arg(long, global = true, default_value = "pull_up")]
    exercise: String,

    /// Directory holding per-exercise history files (defaults to the
    /// platform data directory).
    #[arg(long, global = true, value_name = "DIR")]
    history_path: Option<PathBuf>,

    /// Emit machine-readable JSON instead of tables/text.
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity of diagnostic logging.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a profile with starting bodyweight, schedule, and baselines.
    Init {
        #[arg(long)]
        bodyweight: f64,
        #[arg(long, default_value_t = 3)]
        days_per_week: u8,
        /// `exercise=value` pairs; repeatable.
        #[arg(long = "baseline", value_parser = parse_kv_f64)]
        baseline: Vec<(String, f64)>,
        /// Exercises to enable; repeatable. Defaults to all three.
        #[arg(long = "enable")]
        enable: Vec<String>,
        #[arg(long)]
        force: bool,
    },

    /// Generate an upcoming block of sessions.
    Plan {
        #[arg(long, default_value_t = 4)]
        weeks: u32,
    },

    /// Record a completed session.
    LogSession {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum)]
        session_type: SessionTypeArg,
        #[arg(long)]
        variant: Option<String>,
        #[arg(long)]
        bodyweight: f64,
        /// One per set, formatted `reps:weight_kg:rest_s[:rir]`; repeatable.
        #[arg(long = "set", value_parser = parse_set)]
        sets: Vec<CompletedSet>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show merged plan/history timeline.
    ShowHistory {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Plot the EWMA max estimate over time.
    PlotMax {
        /// Show every replay snapshot instead of only TEST observations.
        #[arg(long)]
        trajectory: bool,
    },

    /// Print the current training status.
    Status,

    /// Print the recommended weekly set volume.
    Volume {
        #[arg(long, default_value_t = 4)]
        weeks: u32,
    },

    /// Explain the reasoning behind one scheduled session.
    Explain {
        /// A date (YYYY-MM-DD) or the literal `next`.
        target: String,
    },

    /// Shift the plan forward (or backward) by inserting/removing REST days.
    Skip {
        #[arg(long, allow_hyphen_values = true)]
        days: i64,
    },

    /// Delete a logged session by its 1-based history id.
    DeleteRecord { id: u64 },

    /// Update the stored bodyweight.
    UpdateWeight {
        #[arg(long)]
        kg: f64,
    },

    /// Show or set the baseline/target max for the current exercise.
    #[command(name = "1rm")]
    Rm1 {
        #[arg(long)]
        set: Option<f64>,
    },

    /// Set a default equipment snapshot attached to future logged sessions.
    UpdateEquipment {
        /// Raw JSON value, e.g. '{"belt_kg": 10}'.
        equipment_json: String,
    },

    /// Print a plain-language explanation of the adaptation rules.
    HelpAdaptation,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SessionTypeArg {
    S,
    H,
    E,
    T,
    Test,
    Rest,
}

impl From<SessionTypeArg> for SessionType {
    fn from(v: SessionTypeArg) -> Self {
        match v {
            SessionTypeArg::S => SessionType::S,
            SessionTypeArg::H => SessionType::H,
            SessionTypeArg::E => SessionType::E,
            SessionTypeArg::T => SessionType::T,
            SessionTypeArg::Test => SessionType::Test,
            SessionTypeArg::Rest => SessionType::Rest,
        }
    }
}

fn parse_kv_f64(s: &str) -> Result<(String, f64), String> {
    let (k, v) = s.split_once('=').ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let v: f64 = v.parse().map_err(|_| format!("'{}' is not a number", v))?;
    Ok((k.to_string(), v))
}

fn parse_set(s: &str) -> Result<CompletedSet, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(format!("expected reps:weight_kg:rest_s[:rir], got '{}'", s));
    }
    let reps: u32 = parts[0].parse().map_err(|_| format!("invalid reps in '{}'", s))?;
    let weight_kg: f64 = parts[1].parse().map_err(|_| format!("invalid weight in '{}'", s))?;
    let rest_s: u32 = parts[2].parse().map_err(|_| format!("invalid rest in '{}'", s))?;
    let rir = if parts.len() == 4 {
        Some(parts[3].parse().map_err(|_| format!("invalid rir in '{}'", s))?)
    } else {
        None
    };
    Ok(CompletedSet { reps, weight_kg, rest_s: Some(rest_s), rir })
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("barcoach")
}

fn history_dir(cli: &Cli) -> PathBuf {
    cli.history_path.clone().unwrap_or_else(|| data_dir().join("history"))
}

fn profile_path() -> PathBuf {
    data_dir().join("profile.json")
}

fn load_profile() -> Result<UserProfile> {
    ProfileStore::new(profile_path())
        .load()?
        .ok_or_else(|| anyhow!("no profile found — run `barcoach init` first"))
}

fn load_exercise(cli: &Cli) -> Result<ExerciseDefinition> {
    get_exercise(&cli.exercise).map_err(Into::into)
}

fn load_history(cli: &Cli) -> Result<(HistoryStore, Vec<SessionResult>, Vec<u64>)> {
    let path = HistoryStore::path_for(&history_dir(cli), &cli.exercise);
    let store = HistoryStore::new(path);
    let records = store.load()?;
    let sessions = records.iter().map(|r| r.session.clone()).collect();
    let ids = records.iter().map(|r| r.id).collect();
    Ok((store, sessions, ids))
}

#[derive(Tabled)]
struct PlanRow {
    date: String,
    #[tabled(rename = "type")]
    session_type: String,
    variant: String,
    week: u32,
    sets: usize,
    reps: String,
    weight_kg: f64,
    rest_s: String,
    expected_tm: i64,
}

#[derive(Tabled)]
struct TimelineRow {
    date: String,
    #[tabled(rename = "type")]
    session_type: String,
    status: String,
    variant: String,
    week: u32,
    summary: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    let log_config = LogConfig { level, format: LogFormat::Compact, ..Default::default() };
    let _ = init_logging(&log_config);

    if let Err(e) = run(&cli) {
        eprintln!("{}", e.to_string().red());
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = Config::default();
    let today = Local::now().date_naive();

    match &cli.command {
        Commands::Init { bodyweight, days_per_week, baseline, enable, force } => {
            cmd_init(cli, *bodyweight, *days_per_week, baseline, enable, *force)
        }
        Commands::Plan { weeks } => cmd_plan(cli, &cfg, *weeks, today),
        Commands::LogSession { date, session_type, variant, bodyweight, sets, notes } => {
            cmd_log_session(cli, &cfg, *date, *session_type, variant.clone(), *bodyweight, sets.clone(), notes.clone(), today)
        }
        Commands::ShowHistory { limit } => cmd_show_history(cli, &cfg, *limit, today),
        Commands::PlotMax { trajectory } => cmd_plot_max(cli, &cfg, *trajectory),
        Commands::Status => cmd_status(cli, &cfg, today),
        Commands::Volume { weeks } => cmd_volume(cli, &cfg, *weeks, today),
        Commands::Explain { target } => cmd_explain(cli, &cfg, target, today),
        Commands::Skip { days } => cmd_skip(cli, *days, today),
        Commands::DeleteRecord { id } => cmd_delete_record(cli, *id),
        Commands::UpdateWeight { kg } => cmd_update_weight(*kg),
        Commands::Rm1 { set } => cmd_rm1(cli, *set),
        Commands::UpdateEquipment { equipment_json } => cmd_update_equipment(cli, equipment_json),
        Commands::HelpAdaptation => cmd_help_adaptation(),
    }
}

fn cmd_init(cli: &Cli, bodyweight: f64, days_per_week: u8, baseline: &[(String, f64)], enable: &[String], force: bool) -> Result<()> {
    if !(1..=5).contains(&days_per_week) {
        return Err(BarcoachError::InvalidInput(format!("days-per-week must be between 1 and 5, got {}", days_per_week)).into());
    }
    let store = ProfileStore::new(profile_path());
    if store.load()?.is_some() && !force {
        return Err(anyhow!("profile already exists at {} — pass --force to overwrite", profile_path().display()));
    }
    let enabled_exercises = if enable.is_empty() { all_exercise_ids().into_iter().map(String::from).collect() } else { enable.to_vec() };
    let profile = UserProfile {
        height_cm: None,
        sex: None,
        bodyweight_kg: bodyweight,
        default_days_per_week: days_per_week,
        exercise_days: Default::default(),
        baseline_max: baseline.iter().cloned().collect(),
        target_max_reps: Default::default(),
        enabled_exercises,
        plan_start_date: Default::default(),
        rest_preference: None,
        injury_notes: None,
    };
    store.save(&profile)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("{}", "Profile created.".green().bold());
    }
    Ok(())
}

fn baseline_for(profile: &UserProfile, exercise: &ExerciseDefinition) -> f64 {
    profile.baseline_max.get(&exercise.id).copied().unwrap_or(1.0)
}

fn plan_start_for(profile: &UserProfile, exercise_id: &str, today: NaiveDate) -> NaiveDate {
    profile.plan_start_date.get(exercise_id).copied().unwrap_or(today)
}

fn cmd_plan(cli: &Cli, cfg: &Config, weeks: u32, today: NaiveDate) -> Result<()> {
    let profile = load_profile()?;
    let exercise = load_exercise(cli)?;
    let (_, history, _) = load_history(cli)?;
    let baseline = baseline_for(&profile, &exercise);
    let plan_start = plan_start_for(&profile, &exercise.id, today);

    let plans = generate_plan(cfg, &profile, &exercise, &history, baseline, plan_start, weeks, today)
        .context("failed to generate plan")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| PlanRow {
            date: p.date.to_string(),
            session_type: p.session_type.to_string(),
            variant: p.variant.clone(),
            week: p.week_number,
            sets: p.planned_sets.len(),
            reps: p.planned_sets.iter().map(|s| s.reps.to_string()).collect::<Vec<_>>().join(","),
            weight_kg: p.planned_sets.first().map(|s| s.weight_kg).unwrap_or(0.0),
            rest_s: p.planned_sets.first().map(|s| s.rest_s.to_string()).unwrap_or_default(),
            expected_tm: p.expected_tm,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

/// The set whose performance is compared against `latest_test_max` for
/// overperformance promotion (spec scenario 5): best reps for a MaxReps
/// exercise, best estimated-1RM set for a OneRmKg exercise.
fn best_set_for_metric(exercise: &ExerciseDefinition, sets: &[CompletedSet]) -> CompletedSet {
    match exercise.target_metric {
        TargetMetric::MaxReps => *sets.iter().max_by_key(|s| s.reps).expect("sets is non-empty"),
        TargetMetric::OneRmKg => *sets
            .iter()
            .max_by(|a, b| {
                let va = a.weight_kg * (1.0 + a.reps as f64 / 30.0);
                let vb = b.weight_kg * (1.0 + b.reps as f64 / 30.0);
                va.partial_cmp(&vb).unwrap()
            })
            .expect("sets is non-empty"),
    }
}

fn latest_test_max(exercise: &ExerciseDefinition, history: &[SessionResult], baseline: f64) -> f64 {
    let mut tests: Vec<(NaiveDate, f64)> = history
        .iter()
        .filter(|s| s.session_type == SessionType::Test)
        .map(|s| (s.date, observed_test_max(exercise, s)))
        .collect();
    tests.sort_by_key(|p| p.0);
    tests.last().map(|p| p.1).unwrap_or(baseline)
}

#[allow(clippy::too_many_arguments)]
fn cmd_log_session(
    cli: &Cli,
    cfg: &Config,
    date: Option<NaiveDate>,
    session_type: SessionTypeArg,
    variant: Option<String>,
    bodyweight: f64,
    sets: Vec<CompletedSet>,
    notes: Option<String>,
    today: NaiveDate,
) -> Result<()> {
    if sets.is_empty() {
        return Err(anyhow!("at least one --set is required"));
    }
    let profile = load_profile()?;
    let exercise = load_exercise(cli)?;
    let (store, history, _) = load_history(cli)?;
    let baseline = baseline_for(&profile, &exercise);
    let plan_start = plan_start_for(&profile, &exercise.id, today);
    let session_date = date.unwrap_or(today);
    let session_type: SessionType = session_type.into();

    // Freeze the active plan's prescription for this date onto the
    // logged record, so the timeline reads from history rather than a
    // possibly-since-changed planner output (spec invariants 1/2).
    let weeks_needed = (((session_date - plan_start).num_days() / 7) + 2).max(1) as u32;
    let planned_sets = generate_plan(cfg, &profile, &exercise, &history, baseline, plan_start, weeks_needed, today)
        .ok()
        .and_then(|plans| plans.into_iter().find(|p| p.date == session_date && p.session_type == session_type))
        .map(|p| p.planned_sets);

    let session = SessionResult {
        date: session_date,
        exercise_id: exercise.id.clone(),
        session_type,
        variant: variant.unwrap_or(exercise.primary_variant.clone()),
        bodyweight_kg: bodyweight,
        sets: sets.clone(),
        equipment: None,
        planned_sets,
        notes,
    };

    // Overperformance promotion (spec scenario 5): a non-TEST session whose
    // best set exceeds the current latest TEST max gets an additional
    // synthesized TEST record at the same date, so the next plan() ramps
    // from the newly demonstrated max.
    let mut synthesized_test = None;
    if session.session_type != SessionType::Test {
        let current_max = latest_test_max(&exercise, &history, baseline);
        let best_set = best_set_for_metric(&exercise, &sets);
        let achieved = observed_test_max(&exercise, &session);
        if achieved > current_max {
            synthesized_test = Some(SessionResult {
                date: session.date,
                exercise_id: exercise.id.clone(),
                session_type: SessionType::Test,
                variant: session.variant.clone(),
                bodyweight_kg: bodyweight,
                sets: vec![best_set],
                equipment: None,
                planned_sets: None,
                notes: Some("synthesized from overperformance promotion".to_string()),
            });
        }
    }

    let id = store.append(&session)?;
    let synthesized_id = match &synthesized_test {
        Some(test_session) => Some(store.append(test_session)?),
        None => None,
    };

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "session": session,
                "id": id,
                "synthesized_test": synthesized_test,
                "synthesized_test_id": synthesized_id,
            })
        );
    } else {
        println!("{} (id {})", "Session logged.".green().bold(), id);
        if let Some(test_id) = synthesized_id {
            println!(
                "{} (id {})",
                "Overperformance detected — synthesized a TEST record.".yellow(),
                test_id
            );
        }
    }
    Ok(())
}

fn cmd_show_history(cli: &Cli, cfg: &Config, limit: Option<usize>, today: NaiveDate) -> Result<()> {
    let profile = load_profile()?;
    let exercise = load_exercise(cli)?;
    let (_, history, ids) = load_history(cli)?;
    let baseline = baseline_for(&profile, &exercise);
    let plan_start = plan_start_for(&profile, &exercise.id, today);

    let plans = generate_plan(cfg, &profile, &exercise, &history, baseline, plan_start, 6, today)?;
    let mut timeline = build_timeline(cfg, &plans, &history, &ids, today);

    if let Some(n) = limit {
        let start = timeline.len().saturating_sub(n);
        timeline = timeline.split_off(start);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    let rows: Vec<TimelineRow> = timeline
        .iter()
        .map(|e| {
            let summary = match (&e.actual, e.track_b_estimate) {
                (Some(a), Some((fi, nz))) => format!("reps={} fi_est={:.1} nz_est={:.1}", sum_actual_reps(a), fi, nz),
                (Some(a), None) => format!("reps={}", sum_actual_reps(a)),
                (None, _) => String::new(),
            };
            TimelineRow {
                date: e.date.to_string(),
                session_type: e.session_type.to_string(),
                status: format!("{:?}", e.status).to_lowercase(),
                variant: e.variant.clone(),
                week: e.week_number,
                summary,
            }
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

fn cmd_plot_max(cli: &Cli, cfg: &Config, trajectory: bool) -> Result<()> {
    let profile = load_profile()?;
    let exercise = load_exercise(cli)?;
    let (_, history, _) = load_history(cli)?;
    let baseline = baseline_for(&profile, &exercise);

    let series = build_state_series(cfg, &exercise, &history, baseline);
    let points: Vec<(NaiveDate, f64)> = if trajectory {
        series.iter().map(|s| (s.session.date, s.state_after.m_hat)).collect()
    } else {
        series
            .iter()
            .filter(|s| s.session.session_type == SessionType::Test)
            .map(|s| (s.session.date, s.state_after.m_hat))
            .collect()
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    if points.is_empty() {
        println!("{}", "No data to plot yet.".yellow());
        return Ok(());
    }

    let max_val = points.iter().map(|(_, v)| *v).fold(f64::MIN, f64::max).max(1.0);
    const WIDTH: usize = 50;
    for (date, value) in &points {
        let filled = ((value / max_val) * WIDTH as f64).round() as usize;
        let bar: String = "#".repeat(filled.min(WIDTH));
        println!("{:<12} {:>6.1} |{}", date.to_string(), value, bar.cyan());
    }
    Ok(())
}

fn cmd_status(cli: &Cli, cfg: &Config, today: NaiveDate) -> Result<()> {
    let profile = load_profile()?;
    let exercise = load_exercise(cli)?;
    let (_, history, _) = load_history(cli)?;
    let baseline = baseline_for(&profile, &exercise);

    let compliances: Vec<f64> = history
        .iter()
        .filter(|s| s.session_type != SessionType::Rest && s.session_type != SessionType::Test)
        .map(|s| compliance(sum_actual_reps(s), exercise.target_value))
        .collect();

    let status = compute_status(cfg, &exercise, &history, baseline, &compliances, today);

    if cli.json {
        #[derive(serde::Serialize)]
        struct StatusJson {
            training_max: i64,
            latest_test_max: f64,
            trend_slope: f64,
            is_plateau: bool,
            deload_recommended: bool,
            readiness_z_score: f64,
            fitness: f64,
            fatigue: f64,
        }
        let json = StatusJson {
            training_max: status.training_max,
            latest_test_max: status.latest_test_max,
            trend_slope: status.trend_slope,
            is_plateau: status.is_plateau,
            deload_recommended: status.deload_recommended,
            readiness_z_score: status.readiness_z_score,
            fitness: status.fitness,
            fatigue: status.fatigue,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("{}", format!("Status for {}", exercise.display_name).bold());
    println!("  training max:     {}", status.training_max);
    println!("  latest test max:  {:.1}", status.latest_test_max);
    println!("  trend:            {:+.2} reps/week", status.trend_slope);
    let plateau = if status.is_plateau { "yes".yellow() } else { "no".green() };
    println!("  plateau:          {}", plateau);
    let deload = if status.deload_recommended { "recommended".red() } else { "not needed".green() };
    println!("  deload:           {}", deload);
    println!("  readiness z:      {:.2}", status.readiness_z_score);
    println!("  fitness/fatigue:  {:.2} / {:.2}", status.fitness, status.fatigue);
    Ok(())
}

fn cmd_volume(cli: &Cli, cfg: &Config, weeks: u32, today: NaiveDate) -> Result<()> {
    let profile = load_profile()?;
    let exercise = load_exercise(cli)?;
    let (_, history, _) = load_history(cli)?;
    let baseline = baseline_for(&profile, &exercise);

    let window_start = today - chrono::Duration::weeks(weeks as i64);
    let recent: Vec<&SessionResult> = history
        .iter()
        .filter(|s| s.date >= window_start && s.session_type != SessionType::Rest && s.session_type != SessionType::Test)
        .collect();

    let compliances: Vec<f64> = recent.iter().map(|s| compliance(sum_actual_reps(s), exercise.target_value)).collect();
    let weekly_compliance_value = barcoach::metrics::weekly_compliance(&compliances);

    let status = compute_status(cfg, &exercise, &history, baseline, &compliances, today);
    let base_weekly_sets: f64 = recent.iter().map(|s| s.sets.len() as f64).sum::<f64>() / weeks.max(1) as f64;
    let base_weekly_sets = if base_weekly_sets > 0.0 { base_weekly_sets } else { cfg.volume_floor as f64 };

    let recommended = barcoach::adaptation::volume_policy(cfg, base_weekly_sets, status.deload_recommended, status.readiness_z_score, weekly_compliance_value);

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "base_weekly_sets": base_weekly_sets,
                "recommended_weekly_sets": recommended,
                "weekly_compliance": weekly_compliance_value,
            })
        );
        return Ok(());
    }

    println!("base weekly sets:        {:.1}", base_weekly_sets);
    println!("recommended weekly sets: {:.1}", recommended);
    println!("weekly compliance:       {:.0}%", weekly_compliance_value * 100.0);
    Ok(())
}

fn cmd_explain(cli: &Cli, cfg: &Config, target: &str, today: NaiveDate) -> Result<()> {
    let profile = load_profile()?;
    let exercise = load_exercise(cli)?;
    let (_, history, _) = load_history(cli)?;
    let baseline = baseline_for(&profile, &exercise);
    let plan_start = plan_start_for(&profile, &exercise.id, today);

    let plans = generate_plan(cfg, &profile, &exercise, &history, baseline, plan_start, 8, today)?;

    let slot = if target == "next" {
        plans.iter().find(|p| p.date >= today)
    } else {
        let date: NaiveDate = target.parse().map_err(|_| anyhow!("'{}' is not a date (YYYY-MM-DD) or 'next'", target))?;
        plans.iter().find(|p| p.date == date)
    };
    let Some(plan) = slot else {
        return Err(anyhow!("no scheduled session found for '{}'", target));
    };

    let compliances: Vec<f64> = history
        .iter()
        .filter(|s| s.session_type != SessionType::Rest && s.session_type != SessionType::Test)
        .map(|s| compliance(sum_actual_reps(s), exercise.target_value))
        .collect();
    let status = compute_status(cfg, &exercise, &history, baseline, &compliances, today);

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "date": plan.date,
                "session_type": plan.session_type.to_string(),
                "variant": plan.variant,
                "expected_tm": plan.expected_tm,
                "planned_sets": plan.planned_sets,
                "readiness_z": status.readiness_z_score,
                "deload_recommended": status.deload_recommended,
            })
        );
        return Ok(());
    }

    println!("{} on {} ({})", plan.session_type, plan.date, plan.variant);
    println!("  expected training max: {}", plan.expected_tm);
    println!("  readiness z-score:     {:.2}", status.readiness_z_score);
    if status.deload_recommended {
        println!("  {}", "deload is currently recommended".yellow());
    }
    for (i, set) in plan.planned_sets.iter().enumerate() {
        println!("  set {}: {} reps @ {:.1} kg, rest {}s", i + 1, set.reps, set.weight_kg, set.rest_s);
    }
    Ok(())
}

fn cmd_skip(cli: &Cli, days: i64, today: NaiveDate) -> Result<()> {
    let exercise = load_exercise(cli)?;
    let (store, history, _) = load_history(cli)?;
    let result = shift_forward(&exercise.id, &history, today, days);

    store.append_all(&result.rest_records_to_add)?;
    if !result.dates_to_remove.is_empty() {
        store.delete_rest_on_dates(&result.dates_to_remove)?;
    }

    let profile_store = ProfileStore::new(profile_path());
    if let Some(mut profile) = profile_store.load()? {
        profile.plan_start_date.insert(exercise.id.clone(), result.new_plan_start);
        profile_store.save(&profile)?;
    }

    if cli.json {
        println!("{}", serde_json::json!({ "new_plan_start": result.new_plan_start }));
    } else {
        println!("Plan anchor moved to {}.", result.new_plan_start);
    }
    Ok(())
}

fn cmd_delete_record(cli: &Cli, id: u64) -> Result<()> {
    let (store, _, _) = load_history(cli)?;
    store.delete(id)?;
    println!("{}", format!("Deleted record {}.", id).green());
    Ok(())
}

fn cmd_update_weight(kg: f64) -> Result<()> {
    let store = ProfileStore::new(profile_path());
    let mut profile = store.load()?.ok_or_else(|| anyhow!("no profile found — run `barcoach init` first"))?;
    profile.bodyweight_kg = kg;
    store.save(&profile)?;
    println!("{}", format!("Bodyweight updated to {:.1} kg.", kg).green());
    Ok(())
}

fn cmd_rm1(cli: &Cli, set: Option<f64>) -> Result<()> {
    let exercise = load_exercise(cli)?;
    let store = ProfileStore::new(profile_path());
    let mut profile = store.load()?.ok_or_else(|| anyhow!("no profile found — run `barcoach init` first"))?;

    if let Some(value) = set {
        profile.baseline_max.insert(exercise.id.clone(), value);
        store.save(&profile)?;
        println!("{}", format!("Baseline max for {} set to {:.1}.", exercise.display_name, value).green());
    } else {
        let value = baseline_for(&profile, &exercise);
        if cli.json {
            println!("{}", serde_json::json!({ "exercise": exercise.id, "baseline_max": value }));
        } else {
            println!("{}: {:.1}", exercise.display_name, value);
        }
    }
    Ok(())
}

fn cmd_update_equipment(cli: &Cli, equipment_json: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(equipment_json).context("equipment argument must be valid JSON")?;
    let exercise = load_exercise(cli)?;
    let path = data_dir().join("equipment").join(format!("{}.json", exercise.id));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(&value)?)?;
    println!("{}", "Default equipment snapshot updated.".green());
    Ok(())
}

fn cmd_help_adaptation() -> Result<()> {
    println!(
        "{}",
        r#"barcoach adapts your plan from three signals:

  fitness/fatigue  - a two-timescale replay of training load (42-day
                     fitness, 7-day fatigue). Readiness is fitness minus
                     fatigue; it drives autoregulation once you have
                     logged at least ten training sessions.
  trend/plateau    - the slope of your TEST results over the trailing
                     three weeks. A flat trend with no recent personal
                     best triggers a plateau flag.
  overtraining     - sessions crowded closer together than your
                     days-per-week schedule implies add rest and, at
                     higher severity, shift the whole plan forward.

Run `barcoach status` to see the current readings, and `barcoach explain
<date>` to see exactly how one session's prescription was derived."#
    );
    Ok(())
}
