pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod drilldown;
pub mod filter;
pub mod generator;
pub mod models;
pub mod options;
pub mod report;

pub use aggregate::{monthly_cumulative, program_breakdown, summarize};
pub use dataset::{Dataset, ReferenceTables};
pub use drilldown::{target_drilldown, DrillDownSelection};
pub use filter::{filter_events, DateRange, FilterSpec, MasteryRange};
pub use models::{
    Client, ClientStatus, Event, MonthlyPoint, Program, ProgramBreakdown, ProgramCategory,
    SummaryStats, Target, TargetRow,
};
