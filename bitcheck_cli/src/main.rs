use bitcheck_cli::config::{AppConfig, ConfigManager, ConfigOverrides, get_config};
use bitcheck_cli::error::{CliError, CliResult, ErrorContext, ExitCode};
use bitcheck_cli::orchestrators::{
    OutputFormat, RunCommandOptions, RunCommandOrchestrator, exit_code_for,
};
use bitcheck_cli::terminal;
use bitcheck_core::RunOptions;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bitcheck")]
#[command(author, version, about = "bitcheck - Format validation for repository bitstreams", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every bitstream in a collection
    Run {
        /// Collection whose bitstreams are validated
        #[arg(short, long)]
        collection: Option<i64>,

        /// Metadata store connection URL
        #[arg(long, value_name = "URL")]
        store_url: Option<String>,

        /// Validator executable
        #[arg(long, value_name = "PATH")]
        validator: Option<PathBuf>,

        /// Root of the sharded asset store
        #[arg(long, value_name = "DIR")]
        asset_root: Option<PathBuf>,

        /// Directory that receives the numbered reports
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Per-invocation time limit in seconds (0 disables it)
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Stop after this many assets
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number given to the first report
        #[arg(long, default_value_t = 0)]
        start_sequence: u64,

        /// Print the planned invocations without running the validator
        #[arg(long)]
        dry_run: bool,

        /// Output format (defaults to output.default_format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Disable progress bar display
        #[arg(long)]
        no_progress: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., store.collection_id)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., validator.timeout_seconds)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,

    /// Show the configuration file location
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("bitcheck_core", log::LevelFilter::Debug)
            .filter_module("bitcheck_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let debug = cli.debug;
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprint!("{}", error.format_for_user(debug));
            error.exit_code()
        }
    };

    std::process::exit(code.code());
}

async fn dispatch(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Run {
            collection,
            store_url,
            validator,
            asset_root,
            output_dir,
            timeout,
            limit,
            start_sequence,
            dry_run,
            format,
            no_progress,
        } => {
            let overrides = ConfigOverrides {
                collection_id: collection,
                store_url,
                validator,
                asset_root,
                output_dir,
                timeout_seconds: timeout,
            };
            let run = RunOptions {
                limit,
                start_sequence,
                dry_run,
            };
            run_command(overrides, run, format, no_progress, cli.debug).await
        }
        Commands::Config { command } => {
            config_command(command)?;
            Ok(ExitCode::Success)
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(ExitCode::Success)
        }
    }
}

async fn run_command(
    overrides: ConfigOverrides,
    run: RunOptions,
    format: Option<OutputFormat>,
    no_progress: bool,
    debug: bool,
) -> CliResult<ExitCode> {
    let mut config: AppConfig = get_config().map_err(|e| {
        CliError::misuse(&format!("Failed to load configuration: {e:#}"))
            .with_context("file", &ConfigManager::new().get_config_path().display().to_string())
    })?;
    config.apply_cli_overrides(&overrides);

    if !config.output.color_enabled {
        colored::control::set_override(false);
    }

    let format = OutputFormat::resolve(
        format,
        &config.output.default_format,
        terminal::is_interactive(),
    );
    let show_progress = !no_progress
        && config.output.progress_enabled
        && terminal::should_show_progress_by_default();

    log::debug!("Run options: {run:?}, format: {format:?}, progress: {show_progress}");

    let orchestrator = RunCommandOrchestrator::new(
        config.pipeline(),
        RunCommandOptions {
            run,
            format,
            show_progress,
        },
    )?;

    let summary = orchestrator.execute().await?;
    orchestrator.display(&summary)?;

    if let Some(reason) = &summary.abort {
        eprint!("{}", CliError::from_abort(reason).format_for_user(debug));
    }

    Ok(exit_code_for(&summary))
}

fn config_command(command: ConfigCommand) -> CliResult<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            let value = manager
                .get(&key)
                .map_err(|e| CliError::misuse(&format!("{e:#}")))?;
            println!("{value}");
        }
        ConfigCommand::Set { key, value } => {
            manager
                .set(&key, &value)
                .map_err(|e| CliError::misuse(&format!("{e:#}")))?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            // Group items by section
            let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (key, value) in items {
                let (section, field) = key.split_once('.').unwrap_or(("general", key.as_str()));
                sections
                    .entry(section.to_string())
                    .or_default()
                    .push((field.to_string(), value));
            }

            for (section, mut items) in sections {
                println!("[{}]", section.yellow());
                items.sort_by(|a, b| a.0.cmp(&b.0));
                for (key, value) in items {
                    println!("  {} = {}", key.cyan(), value);
                }
                println!();
            }
        }
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
