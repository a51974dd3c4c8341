use std::fmt::Write as _;

use recovery_core::engine::{CLEARED_MESSAGE, CheckIn};
use recovery_core::model::Plan;
use services::Dashboard;

const BAR_WIDTH: usize = 30;

/// Text progress bar, e.g. `[#########.....]`.
pub fn progress_bar(fraction: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    // `fraction` is in [0, 1], so the product fits in BAR_WIDTH.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((fraction * BAR_WIDTH as f64).floor() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn setup_hint() -> &'static str {
    "No recovery plan yet.\n\
     Start one with `backlog start --backlog N --daily-load N`\n\
     or `backlog start-subjects --subject NAME=N ... --daily-load N`."
}

pub fn dashboard(view: &Dashboard) -> String {
    let mut out = String::new();
    if view.cleared {
        let _ = writeln!(out, "{CLEARED_MESSAGE}");
        let _ = writeln!(out, "Run `backlog reset` to start a new plan.");
        return out;
    }

    let _ = writeln!(
        out,
        "{} {}% ({} of {} left)",
        progress_bar(view.progress),
        view.percent_complete(),
        view.remaining,
        view.original
    );
    let _ = writeln!(out, "Today's target: {} lecture(s)", view.todays_target);
    let _ = writeln!(out, "Daily load:     {}", view.daily_load);
    if let Some(mode) = view.mode {
        let _ = writeln!(out, "Mode:           {mode}");
    }
    if let Some(missed) = view.missed_count.filter(|m| *m > 0) {
        let _ = writeln!(out, "Missed in a row: {missed}");
    }
    let _ = writeln!(
        out,
        "Finish:         {} ({} day(s) from {})",
        view.finish_date, view.days_remaining, view.start_date
    );

    if !view.subjects.is_empty() {
        let _ = writeln!(out, "Subjects:");
        for subject in &view.subjects {
            let _ = writeln!(
                out,
                "  {:<20} {}/{}",
                subject.name, subject.backlog, subject.original
            );
        }
    }
    out
}

pub fn todays_plan(view: &Dashboard) -> String {
    if view.cleared {
        return format!("{CLEARED_MESSAGE}\n");
    }
    if view.todays_plan.is_empty() {
        return format!("Today: {} lecture(s)\n", view.todays_target);
    }
    let mut out = String::from("Today:\n");
    for allocation in &view.todays_plan {
        let _ = writeln!(out, "  {:<20} {}", allocation.subject, allocation.units);
    }
    out
}

pub fn check_in(check_in: &CheckIn<Plan>) -> String {
    let mut out = format!("{}\n", check_in.message);
    for allocation in check_in.consumed.iter().filter(|a| a.units > 0) {
        let _ = writeln!(out, "  {:<20} -{}", allocation.subject, allocation.units);
    }
    if check_in.is_cleared() {
        let _ = writeln!(out, "{CLEARED_MESSAGE}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use recovery_core::engine::RecoveryEngine;
    use recovery_core::model::{PlanState, SubjectPlanDraft};
    use recovery_core::time::fixed_today;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(0.0), format!("[{}]", ".".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(1.0), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(progress_bar(0.5).matches('#').count(), BAR_WIDTH / 2);
        assert_eq!(progress_bar(f64::NAN).matches('#').count(), 0);
    }

    #[test]
    fn dashboard_shows_mode_and_finish() {
        let engine = RecoveryEngine::default();
        let plan = Plan::Single(PlanState::new(10, 3, fixed_today()).unwrap());
        let text = dashboard(&Dashboard::from_plan(&engine, &plan));
        assert!(text.contains("0% (10 of 10 left)"));
        assert!(text.contains("Mode:           Normal Recovery"));
        assert!(text.contains("2023-11-18"));
    }

    #[test]
    fn cleared_plan_is_celebrated() {
        let engine = RecoveryEngine::default();
        let plan = Plan::Single(PlanState::new(2, 5, fixed_today()).unwrap());
        let result = engine.complete(&plan);
        let text = check_in(&result);
        assert!(text.starts_with("You reclaimed 2 lecture(s). Momentum maintained."));
        assert!(text.contains(CLEARED_MESSAGE));

        let view = Dashboard::from_plan(&engine, &result.state);
        assert!(dashboard(&view).starts_with(CLEARED_MESSAGE));
    }

    #[test]
    fn subject_check_in_lists_consumed_units() {
        let engine = RecoveryEngine::default();
        let mut draft = SubjectPlanDraft::new();
        draft.add_subject("A", 3).unwrap().add_subject("B", 1).unwrap();
        let plan = Plan::Subjects(draft.generate(2, fixed_today()).unwrap());

        let text = todays_plan(&Dashboard::from_plan(&engine, &plan));
        assert!(text.contains("A"));
        assert!(!text.contains("B "));

        let text = check_in(&engine.complete(&plan));
        assert!(text.contains("A                    -1"));
        assert!(text.contains("B                    -1"));
    }
}
