use std::collections::BTreeSet;

use chrono::{Months, NaiveDate, Utc};
use serde::Serialize;

use crate::dataset::ReferenceTables;
use crate::models::{Event, ProgramCategory};

pub const DEFAULT_WINDOW_MONTHS: u32 = 6;

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Inclusive bounds on a target's mastery percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MasteryRange {
    pub min: f64,
    pub max: f64,
}

impl MasteryRange {
    pub const FULL: MasteryRange = MasteryRange {
        min: 0.0,
        max: 100.0,
    };

    pub fn contains(&self, mastery: f64) -> bool {
        self.min <= mastery && mastery <= self.max
    }
}

/// The complete set of active facets. An empty selection set places no
/// restriction on its facet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSpec {
    pub client_ids: BTreeSet<String>,
    pub program_ids: BTreeSet<String>,
    pub target_ids: BTreeSet<String>,
    pub categories: BTreeSet<ProgramCategory>,
    pub therapists: BTreeSet<String>,
    pub date_range: DateRange,
    pub mastery_range: MasteryRange,
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec::default_as_of(Utc::now().date_naive())
    }
}

impl FilterSpec {
    /// Last six months up to `today`, full mastery range, nothing selected.
    pub fn default_as_of(today: NaiveDate) -> Self {
        FilterSpec::with_window(today, DEFAULT_WINDOW_MONTHS)
    }

    pub fn with_window(today: NaiveDate, months: u32) -> Self {
        let start = today
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN);

        FilterSpec {
            client_ids: BTreeSet::new(),
            program_ids: BTreeSet::new(),
            target_ids: BTreeSet::new(),
            categories: BTreeSet::new(),
            therapists: BTreeSet::new(),
            date_range: DateRange { start, end: today },
            mastery_range: MasteryRange::FULL,
        }
    }

    pub fn toggle_client(mut self, id: &str) -> Self {
        toggle(&mut self.client_ids, id.to_string());
        self
    }

    pub fn toggle_program(mut self, id: &str) -> Self {
        toggle(&mut self.program_ids, id.to_string());
        self
    }

    pub fn toggle_target(mut self, id: &str) -> Self {
        toggle(&mut self.target_ids, id.to_string());
        self
    }

    pub fn toggle_category(mut self, category: ProgramCategory) -> Self {
        toggle(&mut self.categories, category);
        self
    }

    pub fn toggle_therapist(mut self, therapist: &str) -> Self {
        toggle(&mut self.therapists, therapist.to_string());
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = DateRange { start, end };
        self
    }

    pub fn with_mastery_range(mut self, min: f64, max: f64) -> Self {
        self.mastery_range = MasteryRange { min, max };
        self
    }

    /// Empties every selection set. Date and mastery ranges are kept.
    pub fn clear_facets(mut self) -> Self {
        self.client_ids.clear();
        self.program_ids.clear();
        self.target_ids.clear();
        self.categories.clear();
        self.therapists.clear();
        self
    }

    pub fn matches(&self, event: &Event, tables: &ReferenceTables<'_>) -> bool {
        if !selected(&self.client_ids, &event.client_id) {
            return false;
        }
        if !selected(&self.program_ids, &event.program_id) {
            return false;
        }
        if !selected(&self.target_ids, &event.target_id) {
            return false;
        }

        // Unresolvable foreign keys skip their predicate instead of excluding
        // the event.
        if let Some(target) = tables.target(&event.target_id) {
            if !self.mastery_range.contains(target.mastery) {
                return false;
            }
        }

        if !self.categories.is_empty() {
            if let Some(program) = tables.program(&event.program_id) {
                if !self.categories.contains(&program.category) {
                    return false;
                }
            }
        }

        if !self.therapists.is_empty() {
            if let Some(client) = tables.client(&event.client_id) {
                if !self.therapists.contains(&client.therapist) {
                    return false;
                }
            }
        }

        self.date_range.contains(event.date)
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if set.contains(&value) {
        set.remove(&value);
    } else {
        set.insert(value);
    }
}

fn selected(set: &BTreeSet<String>, id: &str) -> bool {
    set.is_empty() || set.contains(id)
}

/// Narrows `events` to those matching every facet of `spec`, preserving
/// input order.
pub fn filter_events<'e>(
    events: &'e [Event],
    spec: &FilterSpec,
    tables: &ReferenceTables<'_>,
) -> Vec<&'e Event> {
    let filtered: Vec<&Event> = events
        .iter()
        .filter(|event| spec.matches(event, tables))
        .collect();

    tracing::debug!(
        input = events.len(),
        output = filtered.len(),
        "filter pass complete"
    );

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, ClientStatus, Program, Target};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client(id: &str, therapist: &str) -> Client {
        Client {
            id: id.to_string(),
            name: format!("Client {id}"),
            age: 8,
            diagnosis_date: date(2021, 6, 1),
            therapist: therapist.to_string(),
            status: ClientStatus::Active,
        }
    }

    fn program(id: &str, category: ProgramCategory) -> Program {
        Program {
            id: id.to_string(),
            name: format!("Program {id}"),
            category,
            target_count: 1,
        }
    }

    fn target(id: &str, program_id: &str, mastery: f64) -> Target {
        Target {
            id: id.to_string(),
            program_id: program_id.to_string(),
            name: format!("Target {id}"),
            mastery,
            trials: 50,
            success_rate: mastery,
        }
    }

    fn event(day: NaiveDate, client: &str, program: &str, target: &str) -> Event {
        Event {
            date: day,
            client_id: client.to_string(),
            program_id: program.to_string(),
            target_id: target.to_string(),
            correct: 4,
            incorrect: 1,
            session_duration: 30,
        }
    }

    struct Fixture {
        clients: Vec<Client>,
        programs: Vec<Program>,
        targets: Vec<Target>,
        events: Vec<Event>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                clients: vec![client("c1", "Dr. Rivera"), client("c2", "Dr. Chen")],
                programs: vec![
                    program("p1", ProgramCategory::Communication),
                    program("p2", ProgramCategory::Academic),
                ],
                targets: vec![target("t1", "p1", 85.0), target("t2", "p2", 40.0)],
                events: vec![
                    event(date(2024, 1, 10), "c1", "p1", "t1"),
                    event(date(2024, 2, 10), "c2", "p2", "t2"),
                    event(date(2024, 3, 10), "c1", "p2", "t2"),
                    event(date(2024, 4, 10), "c2", "p1", "t1"),
                ],
            }
        }

        fn tables(&self) -> ReferenceTables<'_> {
            ReferenceTables::new(&self.clients, &self.programs, &self.targets)
        }

        fn run(&self, spec: &FilterSpec) -> Vec<&Event> {
            filter_events(&self.events, spec, &self.tables())
        }
    }

    fn wide_open() -> FilterSpec {
        FilterSpec::default_as_of(date(2024, 6, 1)).with_date_range(date(2000, 1, 1), date(2030, 1, 1))
    }

    #[test]
    fn default_spec_covers_last_six_months() {
        let spec = FilterSpec::default_as_of(date(2024, 8, 31));
        assert_eq!(spec.date_range.start, date(2024, 2, 29));
        assert_eq!(spec.date_range.end, date(2024, 8, 31));
        assert_eq!(spec.mastery_range, MasteryRange::FULL);
        assert!(spec.client_ids.is_empty() && spec.categories.is_empty());
    }

    #[test]
    fn empty_facets_return_every_event() {
        let fixture = Fixture::new();
        let filtered = fixture.run(&wide_open());
        assert_eq!(filtered.len(), fixture.events.len());
        for (kept, original) in filtered.iter().zip(&fixture.events) {
            assert!(std::ptr::eq(*kept, original));
        }
    }

    #[test]
    fn facets_and_across_or_within() {
        let fixture = Fixture::new();
        let spec = wide_open()
            .toggle_client("c1")
            .toggle_client("c2")
            .toggle_category(ProgramCategory::Academic);

        let filtered = fixture.run(&spec);
        let dates: Vec<NaiveDate> = filtered.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(2024, 2, 10), date(2024, 3, 10)]);

        let spec = spec.toggle_client("c2");
        let filtered = fixture.run(&spec);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].date, date(2024, 3, 10));
    }

    #[test]
    fn therapist_and_target_facets() {
        let fixture = Fixture::new();
        let filtered = fixture.run(&wide_open().toggle_therapist("Dr. Chen"));
        assert!(filtered.iter().all(|e| e.client_id == "c2"));
        assert_eq!(filtered.len(), 2);

        let filtered = fixture.run(&wide_open().toggle_target("t1").toggle_program("p1"));
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|e| e.target_id == "t1"));
    }

    #[test]
    fn date_range_is_inclusive() {
        let fixture = Fixture::new();
        let spec = wide_open().with_date_range(date(2024, 2, 10), date(2024, 3, 10));
        assert_eq!(fixture.run(&spec).len(), 2);
    }

    #[test]
    fn mastery_range_applies_to_target() {
        let fixture = Fixture::new();
        let spec = wide_open().with_mastery_range(80.0, 100.0);
        let filtered = fixture.run(&spec);
        assert!(filtered.iter().all(|e| e.target_id == "t1"));
        assert_eq!(filtered.len(), 2);

        let spec = wide_open().with_mastery_range(40.0, 40.0);
        assert_eq!(fixture.run(&spec).len(), 2);
    }

    #[test]
    fn inverted_ranges_yield_nothing() {
        let fixture = Fixture::new();
        assert!(fixture
            .run(&wide_open().with_mastery_range(90.0, 10.0))
            .is_empty());
        assert!(fixture
            .run(&wide_open().with_date_range(date(2024, 5, 1), date(2024, 1, 1)))
            .is_empty());
    }

    #[test]
    fn unresolved_references_fail_open_per_predicate() {
        let mut fixture = Fixture::new();
        fixture.events.push(event(date(2024, 2, 1), "ghost", "nowhere", "missing"));

        let spec = wide_open()
            .with_mastery_range(90.0, 100.0)
            .toggle_category(ProgramCategory::Behavioral)
            .toggle_therapist("Dr. Nobody");
        let filtered = fixture.run(&spec);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].client_id, "ghost");

        // Id facets compare raw ids and still exclude.
        let filtered = fixture.run(&wide_open().toggle_client("c1"));
        assert!(filtered.iter().all(|e| e.client_id == "c1"));
    }

    #[test]
    fn toggling_twice_restores_spec() {
        let spec = wide_open();
        let round = spec
            .clone()
            .toggle_program("p1")
            .toggle_therapist("Dr. Chen")
            .toggle_program("p1")
            .toggle_therapist("Dr. Chen");
        assert_eq!(round, spec);
    }

    #[test]
    fn clear_facets_keeps_ranges() {
        let spec = wide_open()
            .with_mastery_range(10.0, 20.0)
            .toggle_client("c1")
            .toggle_category(ProgramCategory::SelfCare)
            .clear_facets();
        assert!(spec.client_ids.is_empty());
        assert!(spec.categories.is_empty());
        assert_eq!(spec.mastery_range, MasteryRange { min: 10.0, max: 20.0 });
    }
}
