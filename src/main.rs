use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use constellation::io::{read_family, write_layout};
use constellation::{ConstellationLayout, LayoutConfig, LayoutDocument};

/// Lay out a family tree as a 3D constellation.
#[derive(Parser)]
#[command(name = "constellation")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute positions for an ancestral-synth JSON export
    Layout {
        /// Input family document (.json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output layout file (.json)
        #[arg(short, long, default_value = "layout.json")]
        output: PathBuf,

        /// Layout configuration (.yaml, .yml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for the initial jitter
        #[arg(long)]
        seed: Option<u64>,

        /// Number of simulation steps
        #[arg(long)]
        iterations: Option<usize>,

        /// Person to center on (defaults to the document's choice)
        #[arg(long)]
        centered: Option<String>,
    },
    /// Print the default configuration as YAML
    Config,
}

struct LayoutArgs<'a> {
    input: &'a Path,
    output: &'a Path,
    config: Option<&'a Path>,
    seed: Option<u64>,
    iterations: Option<usize>,
    centered: Option<&'a str>,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_layout(args: LayoutArgs<'_>) -> anyhow::Result<()> {
    let mut config = match args.config {
        Some(path) => LayoutConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LayoutConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }

    let document =
        read_family(args.input).with_context(|| format!("failed to read {}", args.input.display()))?;
    let mut graph = document.to_graph(args.centered);
    if graph.nodes.is_empty() {
        warn!(input = %args.input.display(), "family document has no persons");
    }

    let layout = ConstellationLayout::new(config);
    let report = layout.calculate(&mut graph.nodes, &graph.edges, &graph.centered_id);
    info!(
        persons = graph.nodes.len(),
        relationships = graph.edges.len(),
        mode = ?report.mode,
        iterations = report.iterations,
        "layout complete"
    );

    let output = LayoutDocument::new(graph.centered_id, report.mode, &graph.nodes);
    write_layout(&output, args.output).with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "Laid out {} persons around '{}' in {}",
        output.nodes.len(),
        output.centered_id,
        args.output.display()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Layout {
            input,
            output,
            config,
            seed,
            iterations,
            centered,
        } => run_layout(LayoutArgs {
            input: &input,
            output: &output,
            config: config.as_deref(),
            seed,
            iterations,
            centered: centered.as_deref(),
        })?,
        Commands::Config => {
            print!("{}", LayoutConfig::default().to_yaml()?);
        }
    }

    Ok(())
}
