use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vigia::cli::{Cli, Command, ConfigArgs};
use vigia::config::Config;
use vigia::intercept::catalog;
use vigia::platform::CommandSpec;
use vigia::resolver::{Requester, Resolver};
use vigia::session::Session;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Discover vigia.toml and apply the command-line overrides
fn load_config(args: &ConfigArgs) -> Result<Config> {
    let dir = match &args.config_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let overrides = args.to_layer()?;
    Config::load(&dir, Some(overrides))
        .with_context(|| format!("Invalid configuration in {}", dir.display()))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("Failed to read current directory")?
        .join(path))
}

fn print_config(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn print_operations(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    for subsystem in config.modules.iter() {
        for operation in catalog::operations(subsystem) {
            println!("{}", operation);
        }
    }
    Ok(())
}

fn resolve(request: &str, from: &Path, entry: Option<&Path>) -> Result<()> {
    let from = absolute(from)?;
    let entry = match entry {
        Some(entry) => absolute(entry)?,
        None => from.clone(),
    };
    let requester = if from == entry {
        Requester::entry(&from)
    } else {
        Requester::from_file(&from)
    };
    let resolved = Resolver::new(entry)
        .resolve(request, Some(&requester))
        .with_context(|| format!("Failed to resolve '{}'", request))?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

/// Run `command` through the watched spawn primitive and return its exit code
fn exec(args: &ConfigArgs, command: &[String]) -> Result<i32> {
    let config = load_config(args)?;
    let Some((program, rest)) = command.split_first() else {
        anyhow::bail!("Must specify a command. Usage: vigia exec -- COMMAND [ARGS...]");
    };

    let session = Session::new(config, absolute(Path::new(program))?);
    let processes = session.processes()?;
    let status = processes
        .spawn(CommandSpec::new(program.as_str(), rest.iter().cloned()))
        .with_context(|| format!("Failed to start {}", program))?
        .wait()
        .with_context(|| format!("Failed waiting for {}", program))?;

    session.shutdown().context("Failed to write shutdown artifacts")?;
    // Killed by a signal: no code to forward
    Ok(status.code().unwrap_or(1))
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match args.command {
        Command::Config(config) => print_config(&config)?,
        Command::Operations(config) => print_operations(&config)?,
        Command::Resolve { request, from, entry } => resolve(&request, &from, entry.as_deref())?,
        Command::Exec { config, command } => {
            let code = exec(&config, &command)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
