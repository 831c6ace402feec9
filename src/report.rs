use std::fmt::Write;

use serde::Serialize;

use crate::aggregate;
use crate::dataset::Dataset;
use crate::drilldown;
use crate::filter::{self, FilterSpec};
use crate::models::{MonthlyPoint, ProgramBreakdown, SummaryStats, TargetRow};

fn join_or_all<I, T>(values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let joined: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    if joined.is_empty() {
        "all".to_string()
    } else {
        joined.join(", ")
    }
}

/// Every dashboard panel for one filter, ranked sections cut to `limit` rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub filter: FilterSpec,
    pub focus: Option<String>,
    pub summary: SummaryStats,
    pub progress: Vec<MonthlyPoint>,
    pub programs: Vec<ProgramBreakdown>,
    pub targets: Vec<TargetRow>,
}

pub fn build_view(
    dataset: &Dataset,
    spec: &FilterSpec,
    focus: Option<&str>,
    limit: usize,
) -> DashboardView {
    let tables = dataset.tables();
    let events = filter::filter_events(&dataset.events, spec, &tables);

    let mut programs = aggregate::program_breakdown(&events, &tables);
    programs.truncate(limit);
    let mut targets = drilldown::target_drilldown(&events, focus, &tables);
    targets.truncate(limit);

    DashboardView {
        filter: spec.clone(),
        focus: focus.map(str::to_string),
        summary: aggregate::summarize(&events, &spec.client_ids, &tables),
        progress: aggregate::monthly_cumulative(&events),
        programs,
        targets,
    }
}

pub fn build_json_report(
    dataset: &Dataset,
    spec: &FilterSpec,
    focus: Option<&str>,
    limit: usize,
) -> anyhow::Result<String> {
    let view = build_view(dataset, spec, focus, limit);
    Ok(serde_json::to_string_pretty(&view)?)
}

pub fn build_report(
    dataset: &Dataset,
    spec: &FilterSpec,
    focus: Option<&str>,
    limit: usize,
) -> String {
    let DashboardView {
        summary,
        progress,
        programs,
        targets,
        ..
    } = build_view(dataset, spec, focus, limit);

    let mut output = String::new();

    let _ = writeln!(output, "# Therapy Progress Report");
    let _ = writeln!(
        output,
        "Sessions from {} to {}, target mastery {:.0}% to {:.0}%",
        spec.date_range.start, spec.date_range.end, spec.mastery_range.min, spec.mastery_range.max
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "- Clients: {}", join_or_all(&spec.client_ids));
    let _ = writeln!(output, "- Programs: {}", join_or_all(&spec.program_ids));
    let _ = writeln!(output, "- Categories: {}", join_or_all(&spec.categories));
    let _ = writeln!(output, "- Therapists: {}", join_or_all(&spec.therapists));
    let _ = writeln!(output, "- Targets: {}", join_or_all(&spec.target_ids));
    let _ = writeln!(output);

    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Active clients: {}", summary.active_clients);
    let _ = writeln!(
        output,
        "- Trials: {} ({} correct, {:.1}% accuracy)",
        summary.total_trials, summary.correct_trials, summary.avg_accuracy
    );
    let _ = writeln!(output, "- Active programs: {}", summary.active_programs);
    let _ = writeln!(output, "- Mastered targets: {}", summary.mastered_targets);
    let _ = writeln!(output);

    let _ = writeln!(output, "## Cumulative Progress");
    if progress.is_empty() {
        let _ = writeln!(output, "No sessions recorded for this window.");
    } else {
        let _ = writeln!(output, "| Month | Correct | Trials | Accuracy |");
        let _ = writeln!(output, "|---|---:|---:|---:|");
        for point in &progress {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.1}% |",
                point.month, point.correct, point.total_trials, point.accuracy
            );
        }
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Programs");
    if programs.is_empty() {
        let _ = writeln!(output, "No programs with sessions in this window.");
    } else {
        for row in &programs {
            let _ = writeln!(
                output,
                "- {} ({}): {} trials, {}% accuracy",
                row.name, row.category, row.total_trials, row.accuracy
            );
        }
    }
    let _ = writeln!(output);

    match focus {
        Some(id) => {
            let _ = writeln!(output, "## Target {id}");
        }
        None => {
            let _ = writeln!(output, "## Top Targets");
        }
    }
    if targets.is_empty() {
        let _ = writeln!(output, "No targets with sessions in this window.");
    } else {
        for row in &targets {
            let _ = writeln!(
                output,
                "- {} [{}] mastery {:.1}%: {} trials over {} sessions, {}% accuracy",
                row.name,
                row.program_name,
                row.mastery,
                row.total_trials,
                row.sessions,
                row.accuracy
            );
        }
    }

    output
}
