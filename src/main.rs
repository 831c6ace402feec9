use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::filter::EnvFilter;

use therapy_progress_dashboard::config::DashboardConfig;
use therapy_progress_dashboard::{
    aggregate, drilldown, filter, generator, options, report, Client, Dataset, DrillDownSelection,
    FilterSpec, Program, ProgramCategory, Target,
};

#[derive(Parser)]
#[command(name = "therapy-dashboard")]
#[command(about = "Progress dashboard for behavioral therapy programs", long_about = None)]
struct Cli {
    /// JSON snapshot or directory of CSV tables; synthetic data when omitted
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Seed for synthetic data
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,
    #[arg(long, global = true, value_enum, default_value_t = Format::Table)]
    format: Format,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Args, Default)]
struct FilterArgs {
    #[arg(long = "client")]
    clients: Vec<String>,
    #[arg(long = "program")]
    programs: Vec<String>,
    #[arg(long = "category")]
    categories: Vec<ProgramCategory>,
    #[arg(long = "therapist")]
    therapists: Vec<String>,
    #[arg(long = "target")]
    targets: Vec<String>,
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end: Option<NaiveDate>,
    #[arg(long)]
    min_mastery: Option<f64>,
    #[arg(long)]
    max_mastery: Option<f64>,
}

impl FilterArgs {
    fn into_spec(self, as_of: NaiveDate, window_months: u32) -> FilterSpec {
        let mut spec = FilterSpec::with_window(as_of, window_months);

        for id in self.clients.iter().collect::<BTreeSet<_>>() {
            spec = spec.toggle_client(id);
        }
        for id in self.programs.iter().collect::<BTreeSet<_>>() {
            spec = spec.toggle_program(id);
        }
        for category in self.categories.into_iter().collect::<BTreeSet<_>>() {
            spec = spec.toggle_category(category);
        }
        for name in self.therapists.iter().collect::<BTreeSet<_>>() {
            spec = spec.toggle_therapist(name);
        }
        for id in self.targets.iter().collect::<BTreeSet<_>>() {
            spec = spec.toggle_target(id);
        }

        let start = self.start.unwrap_or(spec.date_range.start);
        let end = self.end.unwrap_or(spec.date_range.end);
        let min = self.min_mastery.unwrap_or(spec.mastery_range.min);
        let max = self.max_mastery.unwrap_or(spec.mastery_range.max);

        spec.with_date_range(start, end).with_mastery_range(min, max)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic dataset snapshot
    Generate {
        #[arg(long, default_value = "snapshot.json")]
        out: PathBuf,
    },
    /// Headline counters for the filtered sessions
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Cumulative correct trials by month
    Progress {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Trial totals per program
    Programs {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Per-target drill-down
    Targets {
        #[command(flatten)]
        filter: FilterArgs,
        /// Show only this target
        #[arg(long)]
        focus: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Values available to each filter
    Options {
        /// Case-insensitive name search
        #[arg(long, default_value = "")]
        search: String,
        /// Restrict target matches to these programs
        #[arg(long = "program")]
        programs: Vec<String>,
    },
    /// Write the dashboard report, markdown or JSON per --format
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        focus: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

/// Initialize logging, writing to THERAPY_DASHBOARD_LOG_PATH if set, otherwise stderr.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var("THERAPY_DASHBOARD_LOG_PATH") {
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(file)
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dataset(config: &DashboardConfig, as_of: NaiveDate) -> anyhow::Result<Dataset> {
    let dataset = match &config.data_path {
        Some(path) => Dataset::load(path)
            .with_context(|| format!("failed to load dataset from {}", path.display()))?,
        None => generator::generate(config.seed, as_of),
    };

    let dangling = dataset.dangling_references();
    if !dangling.is_empty() {
        tracing::warn!(
            clients = dangling.clients,
            programs = dangling.programs,
            targets = dangling.targets,
            "events reference unknown records; affected facets will not exclude them"
        );
    }

    Ok(dataset)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct FacetOptions<'a> {
    categories: Vec<ProgramCategory>,
    therapists: Vec<String>,
    clients: Vec<&'a Client>,
    programs: Vec<&'a Program>,
    targets: Vec<&'a Target>,
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.data {
        config.data_path = Some(path);
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let as_of = cli.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let format = cli.format;

    match cli.command {
        Commands::Generate { out } => {
            let dataset = generator::generate(config.seed, as_of);
            dataset.save_json(&out)?;
            println!(
                "Wrote {} events for {} clients to {}.",
                dataset.events.len(),
                dataset.clients.len(),
                out.display()
            );
        }
        Commands::Summary { filter } => {
            let dataset = load_dataset(&config, as_of)?;
            let tables = dataset.tables();
            let spec = filter.into_spec(as_of, config.window_months);
            let events = filter::filter_events(&dataset.events, &spec, &tables);
            let summary = aggregate::summarize(&events, &spec.client_ids, &tables);

            if format == Format::Json {
                return print_json(&summary);
            }
            println!("Active clients:   {}", summary.active_clients);
            println!("Total trials:     {}", summary.total_trials);
            println!("Correct trials:   {}", summary.correct_trials);
            println!("Average accuracy: {:.1}%", summary.avg_accuracy);
            println!("Active programs:  {}", summary.active_programs);
            println!("Mastered targets: {}", summary.mastered_targets);
        }
        Commands::Progress { filter } => {
            let dataset = load_dataset(&config, as_of)?;
            let tables = dataset.tables();
            let spec = filter.into_spec(as_of, config.window_months);
            let events = filter::filter_events(&dataset.events, &spec, &tables);
            let points = aggregate::monthly_cumulative(&events);

            if format == Format::Json {
                return print_json(&points);
            }
            if points.is_empty() {
                println!("No sessions found for this window.");
                return Ok(());
            }
            println!("{:<10} {:>10} {:>10} {:>9}", "Month", "Correct", "Trials", "Accuracy");
            for point in &points {
                println!(
                    "{:<10} {:>10} {:>10} {:>8.1}%",
                    point.month, point.correct, point.total_trials, point.accuracy
                );
            }
        }
        Commands::Programs { filter } => {
            let dataset = load_dataset(&config, as_of)?;
            let tables = dataset.tables();
            let spec = filter.into_spec(as_of, config.window_months);
            let events = filter::filter_events(&dataset.events, &spec, &tables);
            let rows = aggregate::program_breakdown(&events, &tables);

            if format == Format::Json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No programs with sessions in this window.");
                return Ok(());
            }
            for row in &rows {
                println!(
                    "- {} ({}) {} trials, {} correct, {}% accuracy",
                    row.name, row.category, row.total_trials, row.correct, row.accuracy
                );
            }
        }
        Commands::Targets {
            filter,
            focus,
            limit,
        } => {
            let dataset = load_dataset(&config, as_of)?;
            let tables = dataset.tables();
            let spec = filter.into_spec(as_of, config.window_months);
            let events = filter::filter_events(&dataset.events, &spec, &tables);
            let selection = match focus.as_deref() {
                Some(id) => DrillDownSelection::Unselected.select(id),
                None => DrillDownSelection::Unselected,
            };
            let mut rows = drilldown::target_drilldown(&events, selection.focus(), &tables);
            rows.truncate(limit);

            if format == Format::Json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No targets with sessions in this window.");
                return Ok(());
            }
            for row in &rows {
                println!(
                    "- {} [{}] mastery {:.1}% {} trials over {} sessions, {}% accuracy",
                    row.name,
                    row.program_name,
                    row.mastery,
                    row.total_trials,
                    row.sessions,
                    row.accuracy
                );
            }
        }
        Commands::Options { search, programs } => {
            let dataset = load_dataset(&config, as_of)?;
            let selected: BTreeSet<String> = programs.into_iter().collect();
            let facets = FacetOptions {
                categories: options::distinct_categories(&dataset.programs),
                therapists: options::distinct_therapists(&dataset.clients),
                clients: options::search_clients(&dataset.clients, &search),
                programs: options::search_programs(&dataset.programs, &search),
                targets: options::search_targets(&dataset.targets, &search, &selected),
            };

            if format == Format::Json {
                return print_json(&facets);
            }
            let categories: Vec<&str> = facets.categories.iter().map(|c| c.label()).collect();
            println!("Categories: {}", categories.join(", "));
            println!("Therapists: {}", facets.therapists.join(", "));
            println!("Clients:");
            for client in &facets.clients {
                println!("- {} ({}, {})", client.name, client.id, client.therapist);
            }
            println!("Programs:");
            for program in &facets.programs {
                println!("- {} ({}, {})", program.name, program.id, program.category);
            }
            println!("Targets:");
            for target in &facets.targets {
                println!("- {} ({}, mastery {:.1}%)", target.name, target.id, target.mastery);
            }
        }
        Commands::Report { filter, focus, out } => {
            let dataset = load_dataset(&config, as_of)?;
            let spec = filter.into_spec(as_of, config.window_months);
            let report = match format {
                Format::Json => report::build_json_report(
                    &dataset,
                    &spec,
                    focus.as_deref(),
                    config.report_limit,
                )?,
                Format::Table => {
                    report::build_report(&dataset, &spec, focus.as_deref(), config.report_limit)
                }
            };
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
