use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::dataset::ReferenceTables;
use crate::models::{Event, MonthlyPoint, ProgramBreakdown, SummaryStats};

/// Targets at or above this mastery count as mastered.
pub const MASTERY_THRESHOLD: f64 = 80.0;

/// Percentage of correct trials, 0 when there were no trials.
pub fn accuracy_pct(correct: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 * 100.0 / total as f64
    }
}

pub fn format_accuracy(correct: u64, total: u64) -> String {
    format!("{:.1}", accuracy_pct(correct, total))
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Dashboard KPIs. A non-empty client selection is reported as the active
/// client count even when some selected clients have no matching events.
pub fn summarize(
    events: &[&Event],
    selected_clients: &BTreeSet<String>,
    tables: &ReferenceTables<'_>,
) -> SummaryStats {
    let mut clients = BTreeSet::new();
    let mut programs = BTreeSet::new();
    let mut targets = BTreeSet::new();
    let mut total_trials = 0u64;
    let mut correct_trials = 0u64;

    for event in events {
        clients.insert(event.client_id.as_str());
        programs.insert(event.program_id.as_str());
        targets.insert(event.target_id.as_str());
        total_trials += event.total_trials();
        correct_trials += u64::from(event.correct);
    }

    let active_clients = if selected_clients.is_empty() {
        clients.len()
    } else {
        selected_clients.len()
    };

    let mastered_targets = targets
        .into_iter()
        .filter_map(|id| tables.target(id))
        .filter(|target| target.mastery >= MASTERY_THRESHOLD)
        .count();

    SummaryStats {
        active_clients,
        total_trials,
        correct_trials,
        avg_accuracy: accuracy_pct(correct_trials, total_trials),
        active_programs: programs.len(),
        mastered_targets,
    }
}

/// Running totals by calendar month, oldest first.
pub fn monthly_cumulative(events: &[&Event]) -> Vec<MonthlyPoint> {
    let mut months: BTreeMap<(i32, u32), (u64, u64)> = BTreeMap::new();

    for event in events {
        let bucket = months
            .entry((event.date.year(), event.date.month()))
            .or_insert((0, 0));
        bucket.0 += u64::from(event.correct);
        bucket.1 += u64::from(event.incorrect);
    }

    let mut correct = 0u64;
    let mut incorrect = 0u64;
    let mut points = Vec::with_capacity(months.len());

    for ((year, month), (month_correct, month_incorrect)) in months {
        correct += month_correct;
        incorrect += month_incorrect;
        let total = correct + incorrect;

        points.push(MonthlyPoint {
            month: month_label(year, month),
            correct,
            accuracy: round_one_decimal(accuracy_pct(correct, total)),
            total_trials: total,
        });
    }

    points
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{month:02} {year}"))
}

/// Per-program totals, most trials first. Ties keep first-seen order and
/// events for unknown programs are dropped.
pub fn program_breakdown(events: &[&Event], tables: &ReferenceTables<'_>) -> Vec<ProgramBreakdown> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<ProgramBreakdown> = Vec::new();

    for event in events {
        let Some(program) = tables.program(&event.program_id) else {
            continue;
        };

        let slot = *index.entry(program.id.as_str()).or_insert_with(|| {
            rows.push(ProgramBreakdown {
                program_id: program.id.clone(),
                name: program.name.clone(),
                category: program.category,
                correct: 0,
                incorrect: 0,
                total_trials: 0,
                accuracy: String::new(),
            });
            rows.len() - 1
        });

        let row = &mut rows[slot];
        row.correct += u64::from(event.correct);
        row.incorrect += u64::from(event.incorrect);
    }

    for row in rows.iter_mut() {
        row.total_trials = row.correct + row.incorrect;
        row.accuracy = format_accuracy(row.correct, row.total_trials);
    }

    rows.sort_by(|a, b| b.total_trials.cmp(&a.total_trials));
    rows
}
