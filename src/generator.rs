//! Deterministic synthetic dataset.
//!
//! The same seed and "as of" date always produce the same snapshot. Every
//! event resolves against the generated tables and carries at least one trial.

use chrono::{Duration, Months, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::dataset::Dataset;
use crate::models::{Client, ClientStatus, Event, Program, ProgramCategory, Target};

pub const CLIENT_COUNT: usize = 24;
const HISTORY_MONTHS: u32 = 12;

const FIRST_NAMES: &[&str] = &[
    "Avery", "Jules", "Kiara", "Mateo", "Noah", "Priya", "Rowan", "Sofia", "Theo", "Zara",
    "Elliot", "Maya",
];

const LAST_NAMES: &[&str] = &[
    "Lee", "Moreno", "Patel", "Nguyen", "Okafor", "Schmidt", "Rossi", "Kim", "Haddad", "Walsh",
];

const THERAPISTS: &[&str] = &[
    "Dr. Sarah Rivera",
    "Dr. Michael Chen",
    "Dr. Amara Osei",
    "Dr. Laura Brennan",
    "Dr. David Katz",
];

const PROGRAMS: &[(&str, ProgramCategory)] = &[
    ("Requesting Items", ProgramCategory::Communication),
    ("Labeling Objects", ProgramCategory::Communication),
    ("Answering Questions", ProgramCategory::Communication),
    ("Turn Taking", ProgramCategory::SocialSkills),
    ("Greetings", ProgramCategory::SocialSkills),
    ("Joint Attention", ProgramCategory::SocialSkills),
    ("Hand Washing", ProgramCategory::SelfCare),
    ("Dressing", ProgramCategory::SelfCare),
    ("Toothbrushing", ProgramCategory::SelfCare),
    ("Waiting", ProgramCategory::Behavioral),
    ("Transitions", ProgramCategory::Behavioral),
    ("Following Directions", ProgramCategory::Behavioral),
    ("Letter Identification", ProgramCategory::Academic),
    ("Counting", ProgramCategory::Academic),
    ("Matching Colors", ProgramCategory::Academic),
];

fn pick<'a>(rng: &mut StdRng, values: &[&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn generate(seed: u64, as_of: NaiveDate) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let clients = generate_clients(&mut rng, as_of);
    let (programs, targets) = generate_programs(&mut rng);
    let events = generate_events(&mut rng, as_of, &clients, &programs, &targets);

    tracing::info!(
        seed,
        clients = clients.len(),
        programs = programs.len(),
        targets = targets.len(),
        events = events.len(),
        "synthetic dataset generated"
    );

    Dataset {
        clients,
        programs,
        targets,
        events,
    }
}

fn generate_clients(rng: &mut StdRng, as_of: NaiveDate) -> Vec<Client> {
    (1..=CLIENT_COUNT)
        .map(|n| {
            let status = match rng.gen_range(0..10) {
                0..=6 => ClientStatus::Active,
                7..=8 => ClientStatus::Inactive,
                _ => ClientStatus::Discharged,
            };
            Client {
                id: format!("client-{n}"),
                name: format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES)),
                age: rng.gen_range(3..=17),
                diagnosis_date: as_of
                    .checked_sub_signed(Duration::days(rng.gen_range(180..=1800)))
                    .unwrap_or(as_of),
                therapist: pick(rng, THERAPISTS).to_string(),
                status,
            }
        })
        .collect()
}

fn generate_programs(rng: &mut StdRng) -> (Vec<Program>, Vec<Target>) {
    let mut programs = Vec::with_capacity(PROGRAMS.len());
    let mut targets = Vec::new();

    for (index, (name, category)) in PROGRAMS.iter().enumerate() {
        let program_id = format!("program-{}", index + 1);
        let target_count: u32 = rng.gen_range(3..=8);

        for step in 1..=target_count {
            let mastery = round_one_decimal(rng.gen_range(0.0..=100.0));
            targets.push(Target {
                id: format!("{program_id}-target-{step}"),
                program_id: program_id.clone(),
                name: format!("{name} - Step {step}"),
                mastery,
                trials: rng.gen_range(20..=400),
                success_rate: mastery,
            });
        }

        programs.push(Program {
            id: program_id,
            name: name.to_string(),
            category: *category,
            target_count,
        });
    }

    (programs, targets)
}

fn generate_events(
    rng: &mut StdRng,
    as_of: NaiveDate,
    clients: &[Client],
    programs: &[Program],
    targets: &[Target],
) -> Vec<Event> {
    let start = as_of
        .checked_sub_months(Months::new(HISTORY_MONTHS))
        .unwrap_or(as_of);
    let span_days = (as_of - start).num_days().max(1);
    let mut events = Vec::new();

    for client in clients {
        let enrolled_count = rng.gen_range(2..=4usize).min(programs.len());
        let enrolled: Vec<&Program> = programs.choose_multiple(rng, enrolled_count).collect();

        for program in enrolled {
            let program_targets: Vec<&Target> = targets
                .iter()
                .filter(|target| target.program_id == program.id)
                .collect();

            for target in program_targets {
                let sessions = rng.gen_range(2..=8);
                for _ in 0..sessions {
                    let trials: u32 = rng.gen_range(5..=20);
                    let hit_rate = (target.mastery / 100.0).clamp(0.05, 0.95);
                    let correct = (0..trials).filter(|_| rng.gen_bool(hit_rate)).count() as u32;

                    events.push(Event {
                        date: start + Duration::days(rng.gen_range(0..=span_days)),
                        client_id: client.id.clone(),
                        program_id: program.id.clone(),
                        target_id: target.id.clone(),
                        correct,
                        incorrect: trials - correct,
                        session_duration: rng.gen_range(15..=90),
                    });
                }
            }
        }
    }

    events.sort_by(|a, b| a.date.cmp(&b.date));
    events
}
