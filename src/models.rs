use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    Active,
    Inactive,
    Discharged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProgramCategory {
    Communication,
    #[serde(rename = "Social Skills")]
    SocialSkills,
    #[serde(rename = "Self-Care")]
    SelfCare,
    Behavioral,
    Academic,
}

impl ProgramCategory {
    pub const ALL: [ProgramCategory; 5] = [
        ProgramCategory::Communication,
        ProgramCategory::SocialSkills,
        ProgramCategory::SelfCare,
        ProgramCategory::Behavioral,
        ProgramCategory::Academic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProgramCategory::Communication => "Communication",
            ProgramCategory::SocialSkills => "Social Skills",
            ProgramCategory::SelfCare => "Self-Care",
            ProgramCategory::Behavioral => "Behavioral",
            ProgramCategory::Academic => "Academic",
        }
    }
}

impl fmt::Display for ProgramCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProgramCategory {
    type Err = String;

    /// Accepts the display label in any case, with spaces, hyphens, or
    /// underscores used interchangeably ("social-skills", "Self Care").
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        ProgramCategory::ALL
            .into_iter()
            .find(|category| {
                category
                    .label()
                    .chars()
                    .filter(|c| !matches!(c, ' ' | '-'))
                    .collect::<String>()
                    .to_ascii_lowercase()
                    == normalized
            })
            .ok_or_else(|| format!("unknown program category: {value}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub diagnosis_date: NaiveDate,
    pub therapist: String,
    pub status: ClientStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: String,
    pub category: ProgramCategory,
    pub target_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub program_id: String,
    pub name: String,
    /// Learned proficiency, 0–100.
    pub mastery: f64,
    pub trials: u32,
    pub success_rate: f64,
}

/// One recorded session for a client/program/target on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub date: NaiveDate,
    pub client_id: String,
    pub program_id: String,
    pub target_id: String,
    pub correct: u32,
    pub incorrect: u32,
    /// Minutes.
    pub session_duration: u32,
}

impl Event {
    pub fn total_trials(&self) -> u64 {
        u64::from(self.correct) + u64::from(self.incorrect)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub active_clients: usize,
    pub total_trials: u64,
    pub correct_trials: u64,
    pub avg_accuracy: f64,
    pub active_programs: usize,
    pub mastered_targets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    /// "Mon YYYY"
    pub month: String,
    pub correct: u64,
    pub accuracy: f64,
    pub total_trials: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramBreakdown {
    pub program_id: String,
    pub name: String,
    pub category: ProgramCategory,
    pub correct: u64,
    pub incorrect: u64,
    pub total_trials: u64,
    pub accuracy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRow {
    pub target_id: String,
    pub name: String,
    pub program_name: String,
    pub mastery: f64,
    pub correct: u64,
    pub incorrect: u64,
    pub sessions: usize,
    pub total_trials: u64,
    pub accuracy: String,
}
