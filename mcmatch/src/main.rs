use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, Subcommand, ValueEnum};
use mccore::algorithm::resolver::ResolverKind;
use mcmatch::data::event::InputTag;
use mcmatch::data::handle::EventStoreHandle;
use mcmatch::data::io::{collect_rows, load_events_json, save_bincode, save_json};
use mcmatch::matching::config::MatchingConfig;
use mcmatch::matching::producer::HitParticleMatcher;
use mcmatch::Result;

#[derive(Parser, Debug)]
#[command(name = "mcmatch", version, about = "Match detector hits to the simulated particles that produced them")]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log per-event details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Attribute the hits of every event in a store and write the relations
    Run(RunArgs),
    /// Load events from a JSON file into a store
    Import(ImportArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// SQLite event store
    #[arg(long)]
    db: PathBuf,

    /// JSON matching configuration
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    hit_label: Option<String>,

    #[arg(long)]
    particle_label: Option<String>,

    #[arg(long)]
    resolver: Option<ResolverKind>,

    #[arg(long)]
    threads: Option<usize>,

    /// Output file for the relations
    #[arg(long)]
    out: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Compress bincode output with zstd
    #[arg(long)]
    compress: bool,
}

#[derive(Parser, Debug)]
struct ImportArgs {
    /// JSON array of events
    #[arg(long)]
    events: PathBuf,

    /// SQLite event store, created if missing
    #[arg(long)]
    db: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Bincode,
}

fn build_config(args: &RunArgs) -> Result<MatchingConfig> {
    let mut config = match &args.config {
        Some(path) => MatchingConfig::from_json_file(path)?,
        None => MatchingConfig::default(),
    };
    if let Some(label) = &args.hit_label {
        config.hit_label = InputTag::new(label);
    }
    if let Some(label) = &args.particle_label {
        config.particle_label = InputTag::new(label);
    }
    if let Some(resolver) = args.resolver {
        config.resolver = resolver;
    }
    if let Some(threads) = args.threads {
        config.num_threads = threads;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    log::info!(
        "matching hits {} to particles {} ({} resolver, {} threads)",
        config.hit_label, config.particle_label, config.resolver, config.num_threads
    );

    let handle = EventStoreHandle::new(&args.db)?;
    handle.create_schema()?;
    let events = handle.read_events()?;
    log::info!("read {} events from {}", events.len(), args.db.display());

    let matcher = HitParticleMatcher::new(config);
    let matches = matcher.produce_all(&events)?;

    let skipped = matches.iter().filter(|m| m.skipped).count();
    let rows = collect_rows(&matches, &events, &matcher.config.particle_label)?;
    let degenerate = rows.iter().filter(|r| !r.data().has_finite_fractions()).count();
    if degenerate > 0 {
        log::warn!("{} relations carry non-finite fractions (hits with zero total energy or electrons)", degenerate);
    }

    match args.format {
        OutputFormat::Json => save_json(&args.out, &rows)?,
        OutputFormat::Bincode => save_bincode(&args.out, &rows, args.compress)?,
    }
    log::info!(
        "wrote {} relations for {} events ({} real-data events skipped) to {}",
        rows.len(), matches.len() - skipped, skipped, args.out.display()
    );
    Ok(())
}

fn import(args: ImportArgs) -> Result<()> {
    let events = load_events_json(&args.events)?;
    let handle = EventStoreHandle::new(&args.db)?;
    handle.create_schema()?;
    for event in &events {
        handle.write_event(event)?;
    }
    log::info!("imported {} events into {}", events.len(), args.db.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Import(args) => import(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
