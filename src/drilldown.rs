use std::collections::HashMap;

use crate::aggregate::format_accuracy;
use crate::dataset::ReferenceTables;
use crate::models::{Event, TargetRow};

/// Which target the detail table is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DrillDownSelection {
    #[default]
    Unselected,
    Target(String),
}

impl DrillDownSelection {
    pub fn select(self, target_id: &str) -> Self {
        DrillDownSelection::Target(target_id.to_string())
    }

    pub fn clear(self) -> Self {
        DrillDownSelection::Unselected
    }

    pub fn focus(&self) -> Option<&str> {
        match self {
            DrillDownSelection::Unselected => None,
            DrillDownSelection::Target(id) => Some(id),
        }
    }
}

/// Per-target totals, most trials first. With a focus only that target's
/// events are considered. Targets missing from the reference table are
/// dropped, so focusing an unknown id yields no rows.
pub fn target_drilldown(
    events: &[&Event],
    focus: Option<&str>,
    tables: &ReferenceTables<'_>,
) -> Vec<TargetRow> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<TargetRow> = Vec::new();

    let scoped = events
        .iter()
        .filter(|event| focus.map_or(true, |id| event.target_id == id));

    for event in scoped {
        let Some(target) = tables.target(&event.target_id) else {
            continue;
        };

        let slot = *index.entry(target.id.as_str()).or_insert_with(|| {
            let program_name = tables
                .program(&target.program_id)
                .map(|program| program.name.clone())
                .unwrap_or_default();
            rows.push(TargetRow {
                target_id: target.id.clone(),
                name: target.name.clone(),
                program_name,
                mastery: target.mastery,
                correct: 0,
                incorrect: 0,
                sessions: 0,
                total_trials: 0,
                accuracy: String::new(),
            });
            rows.len() - 1
        });

        let row = &mut rows[slot];
        row.correct += u64::from(event.correct);
        row.incorrect += u64::from(event.incorrect);
        row.sessions += 1;
    }

    for row in rows.iter_mut() {
        row.total_trials = row.correct + row.incorrect;
        row.accuracy = format_accuracy(row.correct, row.total_trials);
    }

    rows.sort_by(|a, b| b.total_trials.cmp(&a.total_trials));

    tracing::debug!(focus = ?focus, rows = rows.len(), "target drill-down built");
    rows
}
