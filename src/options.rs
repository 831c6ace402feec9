use std::collections::BTreeSet;

use crate::models::{Client, Program, ProgramCategory, Target};

/// Target search results beyond this are not offered.
pub const TARGET_SEARCH_LIMIT: usize = 50;

/// Categories present in the full program table, independent of any filter.
pub fn distinct_categories(programs: &[Program]) -> Vec<ProgramCategory> {
    programs
        .iter()
        .map(|program| program.category)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn distinct_therapists(clients: &[Client]) -> Vec<String> {
    clients
        .iter()
        .map(|client| client.therapist.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn name_matches(name: &str, needle: &str) -> bool {
    needle.is_empty() || name.to_lowercase().contains(needle)
}

pub fn search_clients<'a>(clients: &'a [Client], query: &str) -> Vec<&'a Client> {
    let needle = query.to_lowercase();
    clients
        .iter()
        .filter(|client| name_matches(&client.name, &needle))
        .collect()
}

pub fn search_programs<'a>(programs: &'a [Program], query: &str) -> Vec<&'a Program> {
    let needle = query.to_lowercase();
    programs
        .iter()
        .filter(|program| name_matches(&program.name, &needle))
        .collect()
}

/// Targets whose name matches `query`, limited to the selected programs when
/// any are selected, first [`TARGET_SEARCH_LIMIT`] only.
pub fn search_targets<'a>(
    targets: &'a [Target],
    query: &str,
    selected_programs: &BTreeSet<String>,
) -> Vec<&'a Target> {
    let needle = query.to_lowercase();
    targets
        .iter()
        .filter(|target| {
            selected_programs.is_empty() || selected_programs.contains(&target.program_id)
        })
        .filter(|target| name_matches(&target.name, &needle))
        .take(TARGET_SEARCH_LIMIT)
        .collect()
}
