//! End-to-end checks of filter → aggregate over generated and hand-built data.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use therapy_progress_dashboard::generator::generate;
use therapy_progress_dashboard::{
    filter_events, monthly_cumulative, program_breakdown, summarize, target_drilldown, Dataset,
    DrillDownSelection, Event, FilterSpec, ProgramCategory,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn as_of() -> NaiveDate {
    date(2024, 6, 30)
}

fn everything() -> FilterSpec {
    FilterSpec::default_as_of(as_of()).with_date_range(NaiveDate::MIN, NaiveDate::MAX)
}

fn single_event() -> Dataset {
    Dataset {
        events: vec![Event {
            date: date(2024, 3, 1),
            client_id: "c1".to_string(),
            program_id: "p1".to_string(),
            target_id: "t1".to_string(),
            correct: 8,
            incorrect: 2,
            session_duration: 45,
        }],
        ..Dataset::default()
    }
}

// ---------------------------------------------------------------------------
// Filter properties
// ---------------------------------------------------------------------------

#[test]
fn open_spec_keeps_whole_log() {
    let dataset = generate(11, as_of());
    let tables = dataset.tables();
    let filtered = filter_events(&dataset.events, &everything(), &tables);

    assert_eq!(filtered.len(), dataset.events.len());
    assert!(filtered
        .iter()
        .zip(&dataset.events)
        .all(|(kept, original)| std::ptr::eq(*kept, original)));
}

#[test]
fn filtered_subset_preserves_order() {
    let dataset = generate(11, as_of());
    let tables = dataset.tables();
    let spec = everything()
        .toggle_category(ProgramCategory::Communication)
        .toggle_category(ProgramCategory::Academic)
        .with_mastery_range(30.0, 90.0);

    let filtered = filter_events(&dataset.events, &spec, &tables);
    let positions: Vec<usize> = filtered
        .iter()
        .map(|kept| {
            dataset
                .events
                .iter()
                .position(|original| std::ptr::eq(*kept, original))
                .expect("filtered event comes from the log")
        })
        .collect();

    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    for event in &filtered {
        let target = tables.target(&event.target_id).unwrap();
        assert!((30.0..=90.0).contains(&target.mastery));
        let program = tables.program(&event.program_id).unwrap();
        assert!(matches!(
            program.category,
            ProgramCategory::Communication | ProgramCategory::Academic
        ));
    }
}

#[test]
fn default_window_only_sees_last_six_months() {
    let dataset = generate(5, as_of());
    let tables = dataset.tables();
    let filtered = filter_events(&dataset.events, &FilterSpec::default_as_of(as_of()), &tables);

    assert!(!filtered.is_empty());
    assert!(filtered.len() < dataset.events.len());
    assert!(filtered.iter().all(|e| e.date >= date(2023, 12, 30)));
}

// ---------------------------------------------------------------------------
// Documented scenarios
// ---------------------------------------------------------------------------

#[test]
fn single_event_summary() {
    let dataset = single_event();
    let tables = dataset.tables();
    let spec = FilterSpec::default_as_of(date(2024, 3, 31));
    let filtered = filter_events(&dataset.events, &spec, &tables);

    let summary = summarize(&filtered, &spec.client_ids, &tables);
    assert_eq!(summary.total_trials, 10);
    assert_eq!(summary.correct_trials, 8);
    assert_eq!(summary.avg_accuracy, 80.0);
}

#[test]
fn selected_clients_without_events_still_count() {
    let dataset = single_event();
    let tables = dataset.tables();
    let spec = FilterSpec::default_as_of(date(2024, 3, 31))
        .toggle_client("c1")
        .toggle_client("c2");
    let filtered = filter_events(&dataset.events, &spec, &tables);

    assert_eq!(filtered.len(), 1);
    assert_eq!(summarize(&filtered, &spec.client_ids, &tables).active_clients, 2);
}

#[test]
fn unknown_focus_gives_empty_drilldown() {
    let dataset = generate(9, as_of());
    let tables = dataset.tables();
    let filtered = filter_events(&dataset.events, &everything(), &tables);
    let selection = DrillDownSelection::default().select("no-such-target");

    assert!(target_drilldown(&filtered, selection.focus(), &tables).is_empty());
    assert!(!target_drilldown(&filtered, selection.clear().focus(), &tables).is_empty());
}

// ---------------------------------------------------------------------------
// Aggregate properties on generated data
// ---------------------------------------------------------------------------

#[test]
fn cumulative_series_never_decreases() {
    let dataset = generate(21, as_of());
    let tables = dataset.tables();
    let filtered = filter_events(&dataset.events, &everything(), &tables);
    let points = monthly_cumulative(&filtered);

    assert!(!points.is_empty());
    assert!(points.windows(2).all(|w| w[0].correct <= w[1].correct));
    assert!(points.windows(2).all(|w| w[0].total_trials <= w[1].total_trials));

    let last = points.last().unwrap();
    let summary = summarize(&filtered, &BTreeSet::new(), &tables);
    assert_eq!(last.correct, summary.correct_trials);
    assert_eq!(last.total_trials, summary.total_trials);
}

#[test]
fn rankings_are_descending_and_repeatable() {
    let dataset = generate(21, as_of());
    let tables = dataset.tables();
    let filtered = filter_events(&dataset.events, &everything(), &tables);

    let programs = program_breakdown(&filtered, &tables);
    assert!(programs.windows(2).all(|w| w[0].total_trials >= w[1].total_trials));
    assert_eq!(programs, program_breakdown(&filtered, &tables));

    let targets = target_drilldown(&filtered, None, &tables);
    assert!(targets.windows(2).all(|w| w[0].total_trials >= w[1].total_trials));
    assert_eq!(targets, target_drilldown(&filtered, None, &tables));

    let focus = targets[0].target_id.as_str();
    let focused = target_drilldown(&filtered, Some(focus), &tables);
    assert_eq!(focused.len(), 1);
    assert_eq!(focused, target_drilldown(&filtered, Some(focus), &tables));
    let sessions: usize = targets.iter().map(|row| row.sessions).sum();
    assert_eq!(sessions, filtered.len());
}

#[test]
fn inverted_mastery_range_empties_everything() {
    let dataset = generate(4, as_of());
    let tables = dataset.tables();
    let spec = everything().with_mastery_range(75.0, 25.0);
    let filtered = filter_events(&dataset.events, &spec, &tables);

    assert!(filtered.is_empty());
    let summary = summarize(&filtered, &spec.client_ids, &tables);
    assert_eq!(summary.avg_accuracy, 0.0);
    assert!(monthly_cumulative(&filtered).is_empty());
    assert!(program_breakdown(&filtered, &tables).is_empty());
}
