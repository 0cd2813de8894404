use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tp_blocks::{BlockSolution, LoadParams, TopologyBlock};
use tp_core::{Complex64, Phasor, SystemKind, TrackId, degrees};
use tp_network::{Network, NetworkError, SolveReport};
use tp_topology::{Topology, TopologyError};

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "tp-cli")]
#[command(about = "Traction power-supply network solver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate topology file syntax and structure
    Validate {
        /// Path to the topology YAML or JSON file
        topology_path: PathBuf,
    },
    /// List the blocks of a topology in line order
    Blocks {
        /// Path to the topology YAML or JSON file
        topology_path: PathBuf,
    },
    /// Place loads and solve the network
    Solve {
        /// Path to the topology YAML or JSON file
        topology_path: PathBuf,
        /// Extra load as TRACK@KM=AMPS[/DEG], e.g. 0.1c@12.5=300/25.
        /// DEG is the angle the current lags the voltage by (AC only).
        #[arg(short, long = "load")]
        loads: Vec<LoadArg>,
        /// Print the report and block solutions as JSON
        #[arg(long)]
        json: bool,
        /// Print the compact numeric summary as JSON
        #[arg(long, conflicts_with = "json")]
        compact: bool,
    },
}

/// A load given on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LoadArg {
    track: TrackId,
    km: f64,
    amps: f64,
    lag_deg: f64,
}

impl FromStr for LoadArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let usage = || format!("'{s}' is not TRACK@KM=AMPS[/DEG]");
        let (track, rest) = s.split_once('@').ok_or_else(usage)?;
        let (km, current) = rest.split_once('=').ok_or_else(usage)?;
        let (amps, lag) = match current.split_once('/') {
            Some((a, d)) => (a, Some(d)),
            None => (current, None),
        };
        let track = track.parse::<TrackId>().map_err(|e| e.to_string())?;
        let number = |v: &str| v.trim().parse::<f64>().map_err(|_| usage());
        Ok(Self {
            track,
            km: number(km)?,
            amps: number(amps)?,
            lag_deg: lag.map(number).transpose()?.unwrap_or(0.0),
        })
    }
}

impl LoadArg {
    fn params<T: Phasor>(&self) -> LoadParams<T> {
        LoadParams::new(self.km, self.track, T::from_parts(self.amps, 0.0))
            .with_phase_offset(degrees(self.lag_deg))
    }
}

#[derive(Clone, Copy)]
enum Output {
    Text,
    Json,
    Compact,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a SolveReport,
    solutions: &'a [BlockSolution],
}

fn main() -> CliResult<()> {
    // Logs go to stderr so JSON output stays machine-readable.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { topology_path } => cmd_validate(&topology_path),
        Commands::Blocks { topology_path } => cmd_blocks(&topology_path),
        Commands::Solve {
            topology_path,
            loads,
            json,
            compact,
        } => {
            let output = match (json, compact) {
                (true, _) => Output::Json,
                (_, true) => Output::Compact,
                _ => Output::Text,
            };
            cmd_solve(&topology_path, &loads, output)
        }
    }
}

fn cmd_validate(topology_path: &Path) -> CliResult<()> {
    println!("Validating topology: {}", topology_path.display());
    let topology = tp_topology::load(topology_path)?;
    println!(
        "✓ Topology '{}' is valid ({} blocks, {} sections)",
        topology.name,
        topology.blocks.len(),
        topology.sections.len()
    );
    Ok(())
}

fn cmd_blocks(topology_path: &Path) -> CliResult<()> {
    let topology = tp_topology::load(topology_path)?;
    match topology.system {
        SystemKind::Dc => print_blocks(&build::<f64>(&topology)?),
        SystemKind::Ac => print_blocks(&build::<Complex64>(&topology)?),
    }
    Ok(())
}

fn cmd_solve(topology_path: &Path, loads: &[LoadArg], output: Output) -> CliResult<()> {
    let topology = tp_topology::load(topology_path)?;
    match topology.system {
        SystemKind::Dc => solve::<f64>(&topology, loads, output),
        SystemKind::Ac => solve::<Complex64>(&topology, loads, output),
    }
}

fn build<T: Phasor>(topology: &Topology) -> CliResult<Network<T>> {
    Ok(Network::new(topology.to_description::<T>()?)?)
}

fn print_blocks<T: Phasor>(network: &Network<T>) {
    println!("Blocks of '{}':", network.name());
    for block in network.blocks() {
        println!(
            "  {:>10.3} km  {:<12} {:?}",
            block.coordinate(),
            block.label(),
            block.kind()
        );
    }
    println!("Zones: {}", network.zone_names().join(", "));
}

fn solve<T: Phasor>(topology: &Topology, loads: &[LoadArg], output: Output) -> CliResult<()> {
    let mut network = build::<T>(topology)?;
    for load in loads {
        let label = network.add_load(load.params())?;
        tracing::debug!(%label, track = %load.track, km = load.km, "load placed");
    }
    let report = network.solve()?;

    match output {
        Output::Text => {
            print!("{report}");
            for solution in network.solutions() {
                println!("{solution}");
            }
        }
        Output::Json => {
            let solutions = network.solutions();
            let out = JsonOutput {
                report: &report,
                solutions: &solutions,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Output::Compact => {
            println!("{}", serde_json::to_string_pretty(&network.compact())?);
        }
    }
    Ok(())
}
