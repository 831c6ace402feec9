use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{Client, Event, Program, Target};

/// Immutable snapshot of everything the dashboard reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub clients: Vec<Client>,
    pub programs: Vec<Program>,
    pub targets: Vec<Target>,
    pub events: Vec<Event>,
}

/// Id lookups over a [`Dataset`]. When an id repeats, the first record wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables<'a> {
    clients: HashMap<&'a str, &'a Client>,
    programs: HashMap<&'a str, &'a Program>,
    targets: HashMap<&'a str, &'a Target>,
}

impl<'a> ReferenceTables<'a> {
    pub fn new(clients: &'a [Client], programs: &'a [Program], targets: &'a [Target]) -> Self {
        let mut tables = ReferenceTables::default();
        for client in clients {
            tables.clients.entry(client.id.as_str()).or_insert(client);
        }
        for program in programs {
            tables.programs.entry(program.id.as_str()).or_insert(program);
        }
        for target in targets {
            tables.targets.entry(target.id.as_str()).or_insert(target);
        }
        tables
    }

    pub fn client(&self, id: &str) -> Option<&'a Client> {
        self.clients.get(id).copied()
    }

    pub fn program(&self, id: &str) -> Option<&'a Program> {
        self.programs.get(id).copied()
    }

    pub fn target(&self, id: &str) -> Option<&'a Target> {
        self.targets.get(id).copied()
    }
}

/// Events whose foreign keys do not resolve, counted per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DanglingReferences {
    pub clients: usize,
    pub programs: usize,
    pub targets: usize,
}

impl DanglingReferences {
    pub fn is_empty(&self) -> bool {
        self.clients == 0 && self.programs == 0 && self.targets == 0
    }
}

impl Dataset {
    pub fn tables(&self) -> ReferenceTables<'_> {
        ReferenceTables::new(&self.clients, &self.programs, &self.targets)
    }

    pub fn dangling_references(&self) -> DanglingReferences {
        let tables = self.tables();
        let mut dangling = DanglingReferences::default();

        for event in &self.events {
            if tables.client(&event.client_id).is_none() {
                dangling.clients += 1;
            }
            if tables.program(&event.program_id).is_none() {
                dangling.programs += 1;
            }
            if tables.target(&event.target_id).is_none() {
                dangling.targets += 1;
            }
        }

        dangling
    }

    /// Loads either a JSON snapshot file or a directory of CSV tables.
    pub fn load(path: &Path) -> anyhow::Result<Dataset> {
        let dataset = if path.is_dir() {
            Self::load_csv_dir(path)?
        } else {
            Self::load_json(path)?
        };

        tracing::info!(
            path = %path.display(),
            clients = dataset.clients.len(),
            programs = dataset.programs.len(),
            targets = dataset.targets.len(),
            events = dataset.events.len(),
            "dataset loaded"
        );

        Ok(dataset)
    }

    pub fn load_json(path: &Path) -> anyhow::Result<Dataset> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse snapshot {}", path.display()))
    }

    /// Expects `clients.csv`, `programs.csv`, `targets.csv` and `events.csv`.
    pub fn load_csv_dir(dir: &Path) -> anyhow::Result<Dataset> {
        Ok(Dataset {
            clients: read_csv(&dir.join("clients.csv"))?,
            programs: read_csv(&dir.join("programs.csv"))?,
            targets: read_csv(&dir.join("targets.csv"))?,
            events: read_csv(&dir.join("events.csv"))?,
        })
    }

    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        Ok(())
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<T>().enumerate() {
        let row = result.with_context(|| format!("{}: bad row {}", path.display(), index + 1))?;
        rows.push(row);
    }

    Ok(rows)
}
