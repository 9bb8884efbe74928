use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use otsim_config::config_loader;
use otsim_config::orchestrator::{self, OutputFormat};

/// Synthesize ot-sim configurations for every node of an annotated ICS topology
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the annotated topology YAML file
    #[arg(short, long)]
    topology: PathBuf,

    /// Output directory for the per-node ot-sim configurations
    #[arg(short, long, default_value = "otsim_output")]
    output: PathBuf,

    /// Output format of the generated configurations
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Resolve and configure every node without writing anything
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting otsim-config");
    info!("Topology file: {:?}", args.topology);

    let topology = config_loader::load_topology(&args.topology)?;

    let configs = orchestrator::synthesize(&topology)
        .wrap_err_with(|| format!("Failed to synthesize configurations for {:?}", args.topology))?;

    if args.check {
        info!("Check passed: {} nodes configured, nothing written", configs.len());
        return Ok(());
    }

    info!("Output directory: {:?}", args.output);
    orchestrator::write_configs(&configs, &args.output, args.format)?;

    info!("Configuration synthesis completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["otsim-config", "--topology", "topology.yaml"]);

        assert_eq!(args.topology, PathBuf::from("topology.yaml"));
        assert_eq!(args.output, PathBuf::from("otsim_output"));
        assert_eq!(args.format, OutputFormat::Yaml);
        assert!(!args.check);
    }

    #[test]
    fn test_format_and_check_args() {
        let args = Args::parse_from([
            "otsim-config",
            "-t",
            "topology.yaml",
            "-o",
            "out",
            "--format",
            "json",
            "--check",
        ]);

        assert_eq!(args.output, PathBuf::from("out"));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.check);
    }

    #[test]
    fn test_topology_is_required() {
        assert!(Args::try_parse_from(["otsim-config"]).is_err());
    }
}
