//! narrative-web CLI - Build render payloads for topic co-occurrence networks.

use anyhow::{Context, Result};
use clap::Parser;
use narrative_web::config::NarrativeConfig;
use narrative_web::records::{Dataset, Period, RawRow, RecordStore};
use narrative_web::sample::{self, SampleOptions};
use narrative_web::{Session, SlicePayloadBuilder};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "narrative-web")]
#[command(about = "Build renderer-ready payloads from time-sliced topic networks")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, default_value = "narrative-web.toml")]
    config: PathBuf,

    /// Node table (JSON array of row objects)
    #[arg(long, global = true)]
    nodes: Option<PathBuf>,

    /// Edge table (JSON array of row objects)
    #[arg(long, global = true)]
    edges: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Build the payload for one period
    Build {
        /// Period label, raw or as displayed (defaults to the latest period)
        #[arg(short, long)]
        period: Option<String>,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List periods with node/edge counts and co-occurrence rate
    Periods,

    /// Build every period and write one payload file each
    Precompute {
        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Write a seeded synthetic node/edge table pair
    Sample {
        /// Seed for generation
        #[arg(short = 'S', long)]
        seed: Option<u64>,

        /// Number of periods
        #[arg(long)]
        periods: Option<usize>,

        /// Nodes per period
        #[arg(long)]
        nodes_per_period: Option<usize>,

        /// Edges per period
        #[arg(long)]
        edges_per_period: Option<usize>,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("narrative_web=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = NarrativeConfig::load(Path::new(&cli.config))?;
    let nodes_path = cli
        .nodes
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.input.nodes));
    let edges_path = cli
        .edges
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.input.edges));

    match cli.command {
        Commands::Build { period, output } => {
            let dataset = Arc::new(load_dataset(&nodes_path, &edges_path)?);
            let builder = Arc::new(SlicePayloadBuilder::new(&config));
            let mut session = Session::new(dataset, builder)?;
            if let Some(label) = period {
                session.select(&label)?;
            }

            let payload = session.current()?;
            let json = to_json(&*payload, config.output.pretty)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    println!("Saved {} to {}", payload.period_label, path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Periods => {
            let dataset = load_dataset(&nodes_path, &edges_path)?;
            let builder = SlicePayloadBuilder::new(&config);
            println!("Dataset {}", dataset.version());
            for payload in builder.precompute(&dataset)? {
                let stats = &payload.statistics;
                println!(
                    "  {:<8} {:>5} nodes {:>5} edges {:>6.1}% co-occurring",
                    payload.period_label, stats.total_nodes, stats.total_edges, stats.co_occurrence_rate
                );
            }
            let diagnostics = dataset.diagnostics();
            if !diagnostics.is_empty() {
                println!(
                    "{} warning(s), {} node row(s) and {} edge row(s) dropped",
                    diagnostics.len(),
                    diagnostics.dropped_nodes,
                    diagnostics.dropped_edges
                );
            }
        }

        Commands::Precompute { output_dir } => {
            let dataset = load_dataset(&nodes_path, &edges_path)?;
            let builder = SlicePayloadBuilder::new(&config);
            let output_dir = output_dir
                .unwrap_or_else(|| PathBuf::from(&config.output.directory).join("payloads"));
            fs::create_dir_all(&output_dir)?;

            let payloads = builder.precompute(&dataset)?;
            for payload in &payloads {
                let filename = format!("{}.json", file_stem(&payload.period));
                fs::write(output_dir.join(&filename), to_json(&**payload, config.output.pretty)?)?;
                println!("  Created {}", filename);
            }
            println!(
                "Done! {} payloads saved to {}",
                payloads.len(),
                output_dir.display()
            );
        }

        Commands::Sample {
            seed,
            periods,
            nodes_per_period,
            edges_per_period,
            output_dir,
        } => {
            let seed = seed.unwrap_or_else(rand::random);
            let defaults = SampleOptions::default();
            let options = SampleOptions {
                periods: periods.unwrap_or(defaults.periods),
                nodes_per_period: nodes_per_period.unwrap_or(defaults.nodes_per_period),
                edges_per_period: edges_per_period.unwrap_or(defaults.edges_per_period),
                ..defaults
            };

            println!("Generating sample with seed {}...", seed);
            let tables = sample::generate(seed, &options);

            let (nodes_out, edges_out) = match output_dir {
                Some(dir) => {
                    fs::create_dir_all(&dir)?;
                    (dir.join("nodes.json"), dir.join("edges.json"))
                }
                None => (nodes_path, edges_path),
            };
            for path in [&nodes_out, &edges_out] {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&nodes_out, to_json(&tables.nodes, config.output.pretty)?)?;
            fs::write(&edges_out, to_json(&tables.edges, config.output.pretty)?)?;
            println!(
                "  {} node rows -> {}\n  {} edge rows -> {}",
                tables.nodes.len(),
                nodes_out.display(),
                tables.edges.len(),
                edges_out.display()
            );
        }
    }

    Ok(())
}

fn load_dataset(nodes: &Path, edges: &Path) -> Result<Dataset> {
    let nodes = read_table(nodes)?;
    let edges = read_table(edges)?;
    let dataset = RecordStore::normalize(&nodes, &edges);
    tracing::info!(
        periods = dataset.periods().len(),
        nodes = dataset.node_count(),
        edges = dataset.edge_count(),
        "loaded dataset"
    );
    Ok(dataset)
}

fn read_table(path: &Path) -> Result<Vec<RawRow>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

/// Period label made safe for use as a file name.
fn file_stem(period: &Period) -> String {
    period
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
