use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use log::{info, warn};

use nexis_order::trace::{LogTrace, TraceEvent, TraceSink};
use nexis_order::{
    ArenaStore, BuildOrder, DirStore, NodeStore, OrderConfig, PackageSet, Priority, Resolver,
    StoreKind,
};

#[derive(Parser)]
#[command(
    name = "nexis-order",
    version,
    about = "Compute the build order of NexisOS source packages"
)]
struct Cli {
    /// Packages to build
    #[arg(required = true)]
    targets: Vec<String>,

    /// Package set describing the dependencies of every package
    #[arg(short, long, env = "NEXIS_ORDER_PACKAGES")]
    packages: Utf8PathBuf,

    /// Configuration file; defaults to /etc/nexis/order.toml when present
    #[arg(short, long)]
    config: Option<Utf8PathBuf>,

    /// Weakest priority followed for the requested packages
    #[arg(long)]
    ceiling: Option<Priority>,

    /// Keep node records in this directory instead of memory
    #[arg(long)]
    store_dir: Option<Utf8PathBuf>,

    /// Print every resolver decision to stderr
    #[arg(long)]
    trace: bool,

    /// Print the order and run statistics as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Logs every event and keeps them when asked to
struct CliTrace {
    keep: bool,
    events: Vec<TraceEvent>,
}

impl TraceSink for CliTrace {
    fn record(&mut self, event: TraceEvent) {
        if self.keep {
            self.events.push(event.clone());
        }
        LogTrace.record(event);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn resolve_with<S: NodeStore>(
    store: S,
    packages: &PackageSet,
    config: &OrderConfig,
    targets: &[String],
) -> Result<(BuildOrder, Vec<TraceEvent>)> {
    let trace = CliTrace {
        keep: config.trace,
        events: Vec::new(),
    };
    let mut resolver = Resolver::with_trace(store, packages, config.resolve_options(), trace);

    let result = resolver
        .resolve_targets(targets)
        .with_context(|| format!("Failed to resolve build order for {}", targets.join(", ")))?;

    let (_, trace) = resolver.into_parts();
    Ok((result, trace.events))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = OrderConfig::load_or_default(cli.config.as_ref().map(|p| p.as_std_path()))?;
    if let Some(ceiling) = cli.ceiling {
        config.ceiling = ceiling;
    }
    if let Some(dir) = cli.store_dir {
        config.store = StoreKind::Directory;
        config.store_dir = dir.into_std_path_buf();
    }
    config.trace |= cli.trace;
    config.validate().context("Invalid configuration")?;

    let packages = PackageSet::load(&cli.packages)?;
    if packages.contains(&config.root_id) {
        warn!(
            "Package set contains '{}', which is also the synthetic root id; set root_id to another name",
            config.root_id
        );
    }
    for (package, dependency) in packages.missing_dependencies() {
        warn!(
            "'{}' depends on '{}', which is not in the package set",
            package, dependency
        );
    }

    let (result, events) = match config.store {
        StoreKind::Memory => resolve_with(ArenaStore::new(), &packages, &config, &cli.targets)?,
        StoreKind::Directory => {
            let store = DirStore::open(&config.store_dir).with_context(|| {
                format!("Failed to open node store: {:?}", config.store_dir)
            })?;
            resolve_with(store, &packages, &config, &cli.targets)?
        }
    };

    for event in &events {
        eprintln!("trace: {}", event);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for id in &result.order {
            println!("{}", id);
        }
    }

    info!("nexis-order {}: {} packages ordered", nexis_order::VERSION, result.order.len());
    Ok(())
}
