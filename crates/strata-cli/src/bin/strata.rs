//! Strata CLI - fuse mining-pressure indicators through the dynamic Bayesian network
//!
//! Usage:
//!   strata fuse <file>                 # Fuse a JSON array of indicator sets in order
//!   strata fuse <file> --static -o json
//!   strata structure                   # Print the network structure
//!   strata learn <file>                # Learn root priors from JSON evidence records

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde_json::json;
use strata_core::{
    Evidence, FusedAssessment, FusionConfig, FusionEngine, IndicatorSet, LearningReport,
    Network, NetworkSummary, TrendReport,
};

#[derive(Parser)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "Strata - dynamic Bayesian fusion of mining-pressure risk indicators")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fuse indicator sets sequentially through one engine
    Fuse {
        /// JSON array of {roof, burst, abutment} readings
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON fusion configuration (missing fields take defaults)
        #[arg(short, long, value_name = "CFG")]
        config: Option<PathBuf>,

        /// Disable temporal filtering
        #[arg(long = "static")]
        static_only: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,
    },
    /// Print the network structure
    Structure {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,
    },
    /// Learn root priors from evidence records
    Learn {
        /// JSON array of {node: state} records
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Fuse {
            file,
            config,
            static_only,
            output,
        } => run_fuse(&file, config.as_deref(), static_only, output),
        Command::Structure { output } => run_structure(output),
        Command::Learn { file, output } => run_learn(&file, output),
    };

    if let Err(message) = result {
        eprintln!("Error: {}", message);
        process::exit(1);
    }
}

fn run_fuse(
    file: &Path,
    config: Option<&Path>,
    static_only: bool,
    output: OutputFormat,
) -> Result<(), String> {
    let readings: Vec<IndicatorSet> = read_json(file)?;
    let mut config = match config {
        Some(path) => read_json::<FusionConfig>(path)?,
        None => FusionConfig::default(),
    };
    if static_only {
        config.use_temporal = false;
    }

    let network = Network::mining_pressure().map_err(|e| e.to_string())?;
    let mut engine = FusionEngine::new(network, config).map_err(|e| e.to_string())?;
    let assessments: Vec<FusedAssessment> =
        readings.iter().map(|set| engine.fuse(set)).collect();
    let trend = engine.trend();

    match output {
        OutputFormat::Json => print_json(&json!({
            "assessments": assessments,
            "trend": trend,
            "history_length": engine.history().len(),
        })),
        OutputFormat::Summary => {
            print_fuse_summary(&assessments, trend.as_ref());
            Ok(())
        }
    }
}

fn run_structure(output: OutputFormat) -> Result<(), String> {
    let engine = FusionEngine::mining_default().map_err(|e| e.to_string())?;
    let structure = engine.structure();
    match output {
        OutputFormat::Json => print_json(&structure),
        OutputFormat::Summary => {
            print_network(&structure.network);
            println!(
                "\nHistory: {} / {} (temporal: {})",
                structure.history_length, structure.history_capacity, structure.use_temporal
            );
            Ok(())
        }
    }
}

fn run_learn(file: &Path, output: OutputFormat) -> Result<(), String> {
    let records: Vec<Evidence> = read_json(file)?;
    let mut engine = FusionEngine::mining_default().map_err(|e| e.to_string())?;
    let report = engine
        .learn_parameters(&records)
        .map_err(|e| e.to_string())?;
    match output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Summary => {
            print_learning(&report);
            Ok(())
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("reading '{}': {}", path.display(), e))?;
    serde_json::from_str(&source).map_err(|e| format!("parsing '{}': {}", path.display(), e))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("serializing to JSON: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn print_fuse_summary(assessments: &[FusedAssessment], trend: Option<&TrendReport>) {
    for (step, assessment) in assessments.iter().enumerate() {
        println!(
            "[{}] {} score {:.1} [{:.1}, {:.1}] confidence {:.3} ({})",
            step + 1,
            assessment.risk_level,
            assessment.composite_score,
            assessment.credible_interval.0,
            assessment.credible_interval.1,
            assessment.confidence,
            assessment.computation_method
        );
        let w = &assessment.weights;
        println!(
            "    weights roof={:.3} burst={:.3} abutment={:.3}",
            w.roof, w.burst, w.abutment
        );
        if let Some(reason) = &assessment.fallback_reason {
            println!("    fallback: {}", reason);
        }
        for line in &assessment.recommendations {
            println!("    - {}", line);
        }
    }

    match trend {
        Some(trend) => println!(
            "\nTrend over {} steps: {} (slope {:.2}), current level {}",
            trend.window, trend.direction, trend.slope, trend.current_level
        ),
        None => println!("\nTrend: not enough history"),
    }
}

fn print_network(summary: &NetworkSummary) {
    println!("Nodes ({}):", summary.nodes.len());
    for node in &summary.nodes {
        println!(
            "  {} (states {}): parents [{}], temporal parents [{}]",
            node.name,
            node.cardinality,
            node.intra_parents.join(", "),
            node.temporal_parents.join(", ")
        );
    }
    println!("Topological order: {}", summary.topological_order.join(" -> "));
}

fn print_learning(report: &LearningReport) {
    println!("Learned from {} records", report.records);
    for update in &report.updated {
        let prior: Vec<String> = update.prior.iter().map(|p| format!("{:.4}", p)).collect();
        println!(
            "  {} ({} observations): [{}]",
            update.node,
            update.observations,
            prior.join(", ")
        );
    }
}
