use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use srunner::database::Database;
use srunner::settings::{self, ScreenEdge, WindowPreferences};
use srunner::{Config, Engine, ExecutionRequest, ProvidedInputs, RunnerEvent, Topic};

#[derive(Parser)]
#[command(name = "srunner", version, about = "Run actions from a declarative catalog")]
struct Cli {
    /// Actions document to load instead of the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List actions grouped by category
    List,
    /// List category names
    Categories,
    /// Show one action and the inputs it needs
    Show { id: String },
    /// Run an action
    Run {
        id: String,
        /// Input value as name=value, repeatable
        #[arg(short, long = "input", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
        /// File handed to the action directly
        #[arg(long)]
        file: Option<String>,
    },
    /// Run a command line through the platform shell
    Exec {
        /// Whole command line, e.g. "ls -l | wc -l"
        command: String,
    },
    /// Read or change stored preferences
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Get { key: String },
    Set { key: String, value: String },
    Show,
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

fn load_engine(config: &Config, catalog: Option<PathBuf>) -> Result<Engine> {
    let engine = Engine::with_system_launcher(config);
    engine.events.subscribe(Topic::Process, |event| match event {
        RunnerEvent::ExecutionFinished { command, exit_code } => {
            debug!("'{}' finished with {:?}", command, exit_code)
        }
        RunnerEvent::ExecutionError { command, message } => {
            warn!("'{}' failed: {}", command, message)
        }
        _ => {}
    });

    let hint = catalog.unwrap_or_else(|| config.catalog_path());
    let path = engine
        .loader
        .load(&hint)
        .with_context(|| format!("Failed to load actions from {:?}", hint))?;
    info!("Using actions from {:?}", path);
    Ok(engine)
}

fn open_database(config: &Config) -> Result<Database> {
    Database::new(config.database_path().as_deref())
}

fn run_settings(config: &Config, action: SettingsCommand) -> Result<ExitCode> {
    let db = open_database(config)?;
    match action {
        SettingsCommand::Get { key } => match db.get_setting(&key)? {
            Some(value) => println!("{}", value),
            None => return Ok(ExitCode::FAILURE),
        },
        SettingsCommand::Set { key, value } => db.set_setting(&key, &value)?,
        SettingsCommand::Show => {
            let prefs = WindowPreferences::load(&db)?;
            println!("screen edge:    {}", prefs.screen_edge.as_str());
            println!("docked color:   {}", prefs.docked_color);
            println!("expanded color: {}", prefs.expanded_color);
            println!("corner radius:  {}", prefs.corner_radius);
            println!("follow mouse:   {}", prefs.follow_mouse);
            println!("saved position: {}, {}", prefs.saved_x, prefs.saved_y);
            for edge in [
                ScreenEdge::Left,
                ScreenEdge::Right,
                ScreenEdge::Top,
                ScreenEdge::Bottom,
            ] {
                println!(
                    "offset {:<7} {}",
                    format!("{}:", edge.as_str()),
                    settings::edge_offset(&db, edge)?
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run(config: &Config, cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Settings { action } => run_settings(config, action),
        Commands::List => {
            let engine = load_engine(config, cli.catalog)?;
            for (category, actions) in engine.catalog.categorized() {
                println!("{}", category);
                for action in actions {
                    println!("  {:<20} {}", action.id, action.display_name());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Categories => {
            let engine = load_engine(config, cli.catalog)?;
            for name in engine.catalog.category_names() {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Show { id } => {
            let engine = load_engine(config, cli.catalog)?;
            let action = engine
                .catalog
                .lookup(&id)
                .ok_or_else(|| anyhow!("Action not found: {}", id))?;
            println!("{}", serde_json::to_string_pretty(&action)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Exec { command } => {
            let engine = Engine::with_system_launcher(config);
            let outcome = engine.runner.execute_command(&command);
            if outcome.success {
                println!("{}", outcome.message());
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("{}", outcome.message());
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Run { id, inputs, file } => {
            let engine = load_engine(config, cli.catalog)?;
            let provided = ProvidedInputs {
                values: inputs.into_iter().collect(),
                file,
            };

            match engine.runner.request_execution(&id, &provided) {
                ExecutionRequest::NeedsInputs { missing, .. } => {
                    eprintln!("{} needs inputs: {}", id, missing.join(", "));
                    Ok(ExitCode::from(2))
                }
                ExecutionRequest::Executed(outcome) => {
                    match open_database(config) {
                        Ok(db) => {
                            if let Err(e) = db.log_execution(&outcome.action_id, outcome.success) {
                                warn!("Failed to record execution: {}", e);
                            }
                        }
                        Err(e) => warn!("Execution history unavailable: {}", e),
                    }

                    if outcome.success {
                        println!("{}", outcome.message());
                        Ok(ExitCode::SUCCESS)
                    } else {
                        eprintln!("{}", outcome.message());
                        Ok(ExitCode::FAILURE)
                    }
                }
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::builder().init();

    let cli = Cli::parse();
    let config = Config::init();

    match run(&config, cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
