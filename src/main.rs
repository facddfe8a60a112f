use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use crew_schedule::config::{OptimizerConfig, Scenario};
use crew_schedule::kpi::ScheduleKpi;
use crew_schedule::models::{JsonScheduleSource, ScheduleSource};
use crew_schedule::output::{self, OptimizedSchedule};
use crew_schedule::overview::ProjectOverview;

#[derive(Parser)]
#[command(name = "crew-schedule")]
#[command(
    author,
    version,
    about = "Resource-constrained schedule optimization with sub-crew partitioning"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a normalized schedule (JSON) and export the result
    Optimize(OptimizeArgs),

    /// Summarize a schedule before optimizing it
    Inspect(InspectArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Parser)]
struct OptimizeArgs {
    /// Normalized schedule model (JSON)
    input: PathBuf,

    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override scenario: auto-assign or sub-crew
    #[arg(long)]
    scenario: Option<String>,

    /// Override tracks per pool / group
    #[arg(short = 'n', long)]
    pool_size: Option<i64>,

    /// Per-group sub-crew count, e.g. "Crew A=3" (repeatable)
    #[arg(long = "sub-crew", value_name = "GROUP=N")]
    sub_crews: Vec<String>,

    /// Override solver deadline (seconds)
    #[arg(long)]
    deadline: Option<f64>,

    /// Override solver worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Let free tasks start before the data date
    #[arg(long)]
    ignore_data_date: bool,

    /// Fail unless optimality is proven before the deadline
    #[arg(long)]
    strict: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: Format,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print schedule KPIs to stderr
    #[arg(long)]
    kpi: bool,
}

#[derive(Parser)]
struct InspectArgs {
    /// Normalized schedule model (JSON)
    input: PathBuf,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing - only show logs with --verbose
    let filter = if cli.verbose {
        EnvFilter::new("crew_schedule=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crew_schedule=warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Optimize(args) => run_optimize(args),
        Commands::Inspect(args) => run_inspect(args),
    }
}

fn load_config(args: &OptimizeArgs) -> anyhow::Result<OptimizerConfig> {
    let mut config = match &args.config {
        Some(path) => OptimizerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => OptimizerConfig::default(),
    };

    if let Some(s) = &args.scenario {
        config.scenario = s.parse::<Scenario>()?;
    }
    if let Some(n) = args.pool_size {
        config.resource_pool_size = n;
    }
    for entry in &args.sub_crews {
        let Some((group, n)) = entry.rsplit_once('=') else {
            bail!("invalid --sub-crew '{entry}', expected GROUP=N");
        };
        let n: i64 = n
            .trim()
            .parse()
            .with_context(|| format!("invalid sub-crew count in '{entry}'"))?;
        config.sub_crews.insert(group.trim().to_string(), n);
    }
    if let Some(secs) = args.deadline {
        config.solve_deadline_secs = secs;
    }
    if let Some(threads) = args.threads {
        config.solver_threads = Some(threads);
    }
    if args.ignore_data_date {
        config.respect_data_date = false;
    }
    if args.strict {
        config.accept_feasible = false;
    }
    Ok(config)
}

fn run_optimize(args: OptimizeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let model = JsonScheduleSource::new(&args.input)
        .load()
        .with_context(|| format!("loading schedule {}", args.input.display()))?;

    let schedule = crew_schedule::optimize(&model, &config)?;

    if args.kpi {
        let kpi = ScheduleKpi::calculate(&schedule);
        eprintln!(
            "makespan: {:.1} days, avg utilization: {:.0}%",
            kpi.makespan_days,
            kpi.avg_utilization * 100.0
        );
        for (group, peak) in &kpi.peak_concurrency {
            eprintln!("  {group}: peak {peak} concurrent");
        }
    }

    write_schedule(&schedule, args.format, args.output.as_deref())
}

fn write_schedule(
    schedule: &OptimizedSchedule,
    format: Format,
    path: Option<&Path>,
) -> anyhow::Result<()> {
    let rendered = match format {
        Format::Table => output::render_table(schedule),
        Format::Json => output::to_json(schedule)?,
    };
    match path {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let model = JsonScheduleSource::new(&args.input)
        .load()
        .with_context(|| format!("loading schedule {}", args.input.display()))?;
    let overview = ProjectOverview::from_model(&model);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("Project: {}", overview.name);
    println!("Start: {}", overview.project_start);
    if let Some(d) = overview.data_date {
        println!("Data date: {d}");
    }
    match overview.hours_per_day {
        Some(h) => println!("Hours per day: {h}"),
        None => println!("Hours per day: (no calendar)"),
    }
    println!(
        "Tasks: {} ({} relationships)",
        overview.tasks, overview.relationships
    );
    for (kind, n) in &overview.by_kind {
        println!("  {kind}: {n}");
    }
    println!("Groups:");
    for g in &overview.groups {
        println!("  {}: {} tasks, {} not started", g.name, g.total, g.not_started);
    }
    if overview.ungrouped_not_started > 0 {
        println!("  (ungrouped): {} not started", overview.ungrouped_not_started);
    }
    let suggested = overview.suggested_sub_crews();
    if !suggested.is_empty() {
        let pairs: Vec<String> = suggested.iter().map(|(g, n)| format!("{g}={n}")).collect();
        println!("Suggested sub-crews: {}", pairs.join(", "));
    }
    Ok(())
}
