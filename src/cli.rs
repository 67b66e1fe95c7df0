//! CLI argument parsing for Vigia

use crate::config::ConfigLayer;
use crate::error::Result;
use crate::filter::SubsystemFilter;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vigia")]
#[command(version)]
#[command(about = "Watches storage, process, network and module-load activity", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged configuration as JSON
    Config(ConfigArgs),

    /// List the watched operations of every enabled subsystem
    Operations(ConfigArgs),

    /// Classify and resolve one load request
    Resolve {
        /// Request string as written by the requester (e.g. ./lib, lodash, fs)
        request: String,

        /// File performing the load
        #[arg(long = "from", value_name = "FILE")]
        from: PathBuf,

        /// Entry unit of the process (defaults to --from)
        #[arg(long = "entry", value_name = "FILE")]
        entry: Option<PathBuf>,
    },

    /// Run a command through the watched process primitive
    Exec {
        #[command(flatten)]
        config: ConfigArgs,

        /// Command to run (everything after --)
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

/// Configuration overrides, applied on top of `vigia.toml`
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Directory searched for vigia.toml (default: current directory)
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Append records to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Emit structured records (timestamp + payload object)
    #[arg(long = "structured")]
    pub structured: bool,

    /// Count occurrences instead of deduplicating
    #[arg(short = 'c', long = "frequency")]
    pub frequency: bool,

    /// Subsystems to watch (e.g., -e modules=fs,http or -e modules=network)
    #[arg(short = 'e', long = "expr", value_name = "EXPR")]
    pub filter: Option<String>,

    /// Write the dependency tree document to FILE at shutdown
    #[arg(long = "tree-output", value_name = "FILE")]
    pub tree_output: Option<PathBuf>,

    /// Keep calls attributable to vendored packages
    #[arg(long = "dependencies")]
    pub dependencies: bool,

    /// Log every call as it happens instead of writing a summary
    #[arg(long = "no-summary")]
    pub no_summary: bool,
}

impl ConfigArgs {
    /// Turn the flags into an override layer. Flags left off do not
    /// override the file.
    pub fn to_layer(&self) -> Result<ConfigLayer> {
        let modules = self
            .filter
            .as_deref()
            .map(SubsystemFilter::from_expr)
            .transpose()?
            .map(|filter| filter.iter().map(|s| s.key().to_string()).collect());

        Ok(ConfigLayer {
            output: self.output.clone(),
            structured: self.structured.then_some(true),
            frequency: self.frequency.then_some(true),
            summary: self.no_summary.then_some(false),
            modules,
            require_tree_output: self.tree_output.clone(),
            dependencies: self.dependencies.then_some(true),
            ..ConfigLayer::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_exec_command() {
        let cli = Cli::parse_from(["vigia", "exec", "--", "echo", "hello"]);
        match cli.command {
            Command::Exec { command, .. } => assert_eq!(command, vec!["echo", "hello"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_exec_requires_command() {
        assert!(Cli::try_parse_from(["vigia", "exec"]).is_err());
    }

    #[test]
    fn test_cli_debug_is_global() {
        let cli = Cli::parse_from(["vigia", "config", "--debug"]);
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_resolve_args() {
        let cli = Cli::parse_from(["vigia", "resolve", "./lib", "--from", "/app/main.js"]);
        match cli.command {
            Command::Resolve { request, from, entry } => {
                assert_eq!(request, "./lib");
                assert_eq!(from, PathBuf::from("/app/main.js"));
                assert!(entry.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unset_flags_leave_layer_empty() {
        let layer = ConfigArgs::default().to_layer().unwrap();
        assert_eq!(layer, ConfigLayer::default());
    }

    #[test]
    fn test_flags_map_to_layer() {
        let cli = Cli::parse_from([
            "vigia",
            "exec",
            "-e",
            "modules=network",
            "-c",
            "--no-summary",
            "--tree-output",
            "tree.json",
            "--",
            "true",
        ]);
        let Command::Exec { config, .. } = cli.command else {
            panic!("expected exec");
        };
        let layer = config.to_layer().unwrap();
        assert_eq!(layer.modules, Some(vec!["http".to_string(), "https".to_string()]));
        assert_eq!(layer.frequency, Some(true));
        assert_eq!(layer.summary, Some(false));
        assert_eq!(layer.structured, None);
        assert_eq!(layer.require_tree_output, Some(PathBuf::from("tree.json")));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let args = ConfigArgs {
            filter: Some("modules=smtp".to_string()),
            ..ConfigArgs::default()
        };
        assert!(args.to_layer().is_err());
    }
}
