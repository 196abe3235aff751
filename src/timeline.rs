//! Merge generated plan slots with logged history into a display timeline
//! (§4.6): status tagging, week numbering, and between-test max estimate
//! attachment.

use crate::config::Config;
use crate::max_estimator::track_b_estimate;
use crate::models::{SessionPlan, SessionResult, SessionType, Status, TimelineEntry};
use chrono::{Duration, NaiveDate};

fn monday_on_or_before(date: NaiveDate) -> NaiveDate {
    let weekday = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(weekday)
}

fn week_number(first_monday: NaiveDate, date: NaiveDate) -> u32 {
    (((date - first_monday).num_days() / 7) + 1).max(1) as u32
}

/// Build the merged timeline for one exercise. `history_ids` gives each
/// history record's 1-based storage id in the same order as `history`
/// (see storage.rs).
pub fn build_timeline(
    cfg: &Config,
    plans: &[SessionPlan],
    history: &[SessionResult],
    history_ids: &[u64],
    today: NaiveDate,
) -> Vec<TimelineEntry> {
    let mut history_indexed: Vec<(usize, &SessionResult)> = history.iter().enumerate().collect();
    history_indexed.sort_by_key(|(_, s)| s.date);

    let first_monday = history_indexed
        .iter()
        .filter(|(_, s)| s.session_type != SessionType::Rest)
        .map(|(_, s)| s.date)
        .chain(plans.iter().map(|p| p.date))
        .min()
        .map(monday_on_or_before)
        .unwrap_or_else(|| monday_on_or_before(today));

    let mut matched = vec![false; history_indexed.len()];
    let mut entries: Vec<TimelineEntry> = Vec::new();
    let mut first_future_tagged = false;

    for plan in plans {
        let match_idx = history_indexed
            .iter()
            .position(|(i, s)| !matched[*i] && s.date == plan.date && s.session_type == plan.session_type)
            .or_else(|| history_indexed.iter().position(|(i, s)| !matched[*i] && s.date == plan.date));

        let wn = week_number(first_monday, plan.date);

        if let Some(pos) = match_idx {
            let (orig_idx, session) = history_indexed[pos];
            matched[orig_idx] = true;
            let status = if session.session_type == SessionType::Rest { Status::Rested } else { Status::Done };
            let track_b = if session.session_type != SessionType::Test {
                track_b_estimate(cfg, session)
            } else {
                None
            };
            entries.push(TimelineEntry {
                date: session.date,
                session_type: session.session_type,
                variant: session.variant.clone(),
                status,
                actual: Some(session.clone()),
                prescribed: session.planned_sets.clone(),
                expected_tm: plan.expected_tm,
                history_id: Some(history_ids[orig_idx]),
                track_b_estimate: track_b,
                week_number: wn,
            });
        } else if plan.date < today {
            entries.push(TimelineEntry {
                date: plan.date,
                session_type: plan.session_type,
                variant: plan.variant.clone(),
                status: Status::Missed,
                actual: None,
                prescribed: Some(plan.planned_sets.clone()),
                expected_tm: plan.expected_tm,
                history_id: None,
                track_b_estimate: None,
                week_number: wn,
            });
        } else {
            let status = if !first_future_tagged {
                first_future_tagged = true;
                Status::Next
            } else {
                Status::Planned
            };
            entries.push(TimelineEntry {
                date: plan.date,
                session_type: plan.session_type,
                variant: plan.variant.clone(),
                status,
                actual: None,
                prescribed: Some(plan.planned_sets.clone()),
                expected_tm: plan.expected_tm,
                history_id: None,
                track_b_estimate: None,
                week_number: wn,
            });
        }
    }

    for (orig_idx, session) in &history_indexed {
        if matched[*orig_idx] {
            continue;
        }
        let wn = week_number(first_monday, session.date);
        let track_b = if session.session_type != SessionType::Test {
            track_b_estimate(cfg, session)
        } else {
            None
        };
        entries.push(TimelineEntry {
            date: session.date,
            session_type: session.session_type,
            variant: session.variant.clone(),
            status: Status::Extra,
            actual: Some((*session).clone()),
            prescribed: session.planned_sets.clone(),
            expected_tm: 0,
            history_id: Some(history_ids[*orig_idx]),
            track_b_estimate: track_b,
            week_number: wn,
        });
    }

    entries.sort_by_key(|e| e.date);
    entries
}

/// Future max projection: `max(round(expected_tm / 0.9), latest_test_max)`.
pub fn future_max_projection(expected_tm: i64, latest_test_max: f64) -> f64 {
    ((expected_tm as f64 / 0.9).round()).max(latest_test_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletedSet, PlannedSet};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn plan(date: NaiveDate, session_type: SessionType) -> SessionPlan {
        SessionPlan {
            date,
            exercise_id: "pull_up".into(),
            session_type,
            variant: "pronated".into(),
            expected_tm: 10,
            week_number: 1,
            planned_sets: vec![PlannedSet { reps: 8, weight_kg: 0.0, rest_s: 180 }],
        }
    }

    fn completed(date: NaiveDate, session_type: SessionType) -> SessionResult {
        SessionResult {
            date,
            exercise_id: "pull_up".into(),
            session_type,
            variant: "pronated".into(),
            bodyweight_kg: 82.0,
            sets: vec![CompletedSet { reps: 8, weight_kg: 0.0, rest_s: Some(180), rir: Some(2) }],
            equipment: None,
            planned_sets: None,
            notes: None,
        }
    }

    #[test]
    fn test_matched_session_is_done() {
        let cfg = Config::default();
        let plans = vec![plan(d(2026, 1, 5), SessionType::S)];
        let history = vec![completed(d(2026, 1, 5), SessionType::S)];
        let timeline = build_timeline(&cfg, &plans, &history, &[1], d(2026, 1, 10));
        assert_eq!(timeline[0].status, Status::Done);
        assert_eq!(timeline[0].history_id, Some(1));
    }

    #[test]
    fn test_unmatched_past_slot_is_missed() {
        let cfg = Config::default();
        let plans = vec![plan(d(2026, 1, 5), SessionType::S)];
        let timeline = build_timeline(&cfg, &plans, &[], &[], d(2026, 1, 10));
        assert_eq!(timeline[0].status, Status::Missed);
    }

    #[test]
    fn test_first_future_slot_is_next_rest_are_planned() {
        let cfg = Config::default();
        let plans = vec![plan(d(2026, 1, 15), SessionType::S), plan(d(2026, 1, 17), SessionType::H)];
        let timeline = build_timeline(&cfg, &plans, &[], &[], d(2026, 1, 10));
        assert_eq!(timeline[0].status, Status::Next);
        assert_eq!(timeline[1].status, Status::Planned);
    }

    #[test]
    fn test_unmatched_history_is_extra() {
        let cfg = Config::default();
        let history = vec![completed(d(2026, 1, 6), SessionType::S)];
        let timeline = build_timeline(&cfg, &[], &history, &[1], d(2026, 1, 10));
        assert_eq!(timeline[0].status, Status::Extra);
    }

    #[test]
    fn test_future_max_projection() {
        assert_eq!(future_max_projection(9, 10.0), 10.0);
        assert_eq!(future_max_projection(18, 10.0), 20.0);
    }
}
