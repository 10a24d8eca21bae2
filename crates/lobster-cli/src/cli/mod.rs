//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use lobster_core::{config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "lobster")]
#[command(version)]
#[command(about = "LobsterFoundry agent client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// World server URL (overrides LOBSTER_SERVER and the config file)
    #[arg(long, short, global = true, value_name = "URL")]
    server: Option<String>,

    /// Bot name used when registering (default: `agent_name` from config)
    #[arg(long, short, global = true)]
    name: Option<String>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Register as a new bot and save its credentials
    Register,
    /// Authenticate with saved credentials
    Auth,
    /// Show bot status
    Status,
    /// List all stalls
    Stalls,
    /// Show skill instructions for a stall
    Stall {
        /// Stall ID (e.g. forge_stall)
        #[arg(value_name = "STALL_ID")]
        stall_id: String,
    },
    /// List quests
    Quests {
        /// Only quests at this stall
        #[arg(long)]
        stall: Option<String>,
        /// Only quests with this status
        #[arg(long, default_value = "OPEN")]
        status: String,
    },
    /// Submit work for a quest
    Submit {
        /// Quest ID
        #[arg(short, long)]
        quest: String,
        /// Artifact files or directories
        #[arg(short, long, num_args = 1.., required = true)]
        artifacts: Vec<PathBuf>,
        /// Claims, separated by `;`
        #[arg(short, long)]
        claims: Option<String>,
        /// Requested tokens, separated by `,`
        #[arg(short, long)]
        tokens: Option<String>,
    },
    /// Propose an improvement to a stall's skill instructions
    Improve {
        /// Stall ID (e.g. forge_stall)
        #[arg(long, value_name = "STALL_ID")]
        stall: String,
        /// Improvement type (e.g. DOCUMENTATION)
        #[arg(long = "type", value_name = "TYPE")]
        improvement_type: String,
        /// Short description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Artifact files or directories
        #[arg(short, long, num_args = 1.., required = true)]
        artifacts: Vec<PathBuf>,
        /// Claims, separated by `;`
        #[arg(short, long)]
        claims: Option<String>,
    },
    /// Check that the world server answers
    Test,
    /// Show wallet balance
    Wallet,
    /// Complete a basic task
    Task {
        #[arg(value_parser = ["daily_checkin", "tutorial", "read_notices", "view_ledger"])]
        task_id: String,
    },
    /// Craft an item from a recipe
    Craft {
        /// Recipe ID (iron, steel, tool_basic, tool_advanced)
        recipe: String,
    },
    /// Upgrade the license tier
    Upgrade {
        #[arg(value_parser = ["CITIZEN", "APPRENTICE", "JOURNEYMAN", "MASTER"])]
        license: String,
        /// School, required for APPRENTICE
        #[arg(long)]
        school: Option<String>,
    },
    /// Show costs, rewards, recipes and license requirements
    Economy,
    /// Connect live and stay until Enter or Ctrl-C
    Connect,
    /// Connect, run one work cycle, then disconnect
    Work,
    /// Show status without connecting
    Check,
    /// Move the avatar
    Move {
        #[arg(allow_negative_numbers = true)]
        x: i64,
        #[arg(allow_negative_numbers = true)]
        y: i64,
    },
    /// Celebrate in the world square
    Celebrate,
    /// Take part in verification
    Verify {
        #[command(subcommand)]
        command: VerifyCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum VerifyCommands {
    /// Accept a verification job
    Accept {
        #[arg(value_name = "JOB_ID")]
        job_id: String,
    },
    /// Stamp a verification job
    Stamp {
        #[arg(value_name = "JOB_ID")]
        job_id: String,
        #[arg(value_enum, ignore_case = true)]
        decision: commands::verify::Decision,
        /// Evidence as JSON (plain text is sent as a note)
        #[arg(long)]
        evidence: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose);

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        server,
        name,
        verbose: _,
    } = cli;

    // config commands must work even when the config file is broken
    let command = match command {
        Commands::Config { command } => {
            return match command {
                ConfigCommands::Path => {
                    commands::config::path();
                    Ok(())
                }
                ConfigCommands::Init => commands::config::init(),
            };
        }
        other => other,
    };

    let mut config = config::Config::load().context("load config")?;
    config.apply_server_override(server.as_deref());
    let name = name.unwrap_or_else(|| config.agent_name.clone());

    match command {
        Commands::Register => commands::account::register(config, &name).await,
        Commands::Auth => commands::account::auth(config).await,
        Commands::Status => commands::account::status(config).await,
        Commands::Wallet => commands::account::wallet(config).await,
        Commands::Check => commands::account::check(config).await,

        Commands::Stalls => commands::world::stalls(config).await,
        Commands::Stall { stall_id } => commands::world::stall(config, &stall_id).await,
        Commands::Quests { stall, status } => commands::world::quests(config, stall, status).await,
        Commands::Test => commands::world::test(config).await,
        Commands::Economy => commands::world::economy(config).await,

        Commands::Submit {
            quest,
            artifacts,
            claims,
            tokens,
        } => {
            commands::trade::submit(commands::trade::SubmitOptions {
                config,
                quest_id: &quest,
                artifacts: &artifacts,
                claims: claims.as_deref(),
                tokens: tokens.as_deref(),
            })
            .await
        }
        Commands::Improve {
            stall,
            improvement_type,
            description,
            artifacts,
            claims,
        } => {
            commands::trade::improve(commands::trade::ImprovementOptions {
                config,
                stall_id: &stall,
                improvement_type: &improvement_type,
                description: &description,
                artifacts: &artifacts,
                claims: claims.as_deref(),
            })
            .await
        }
        Commands::Task { task_id } => commands::trade::task(config, &task_id).await,
        Commands::Craft { recipe } => commands::trade::craft(config, &recipe).await,
        Commands::Upgrade { license, school } => {
            commands::trade::upgrade(config, &license, school.as_deref()).await
        }

        Commands::Connect => commands::live::connect(config, &name).await,
        Commands::Work => commands::live::work(config, &name).await,
        Commands::Move { x, y } => commands::live::move_to(config, &name, x, y).await,
        Commands::Celebrate => commands::live::celebrate(config, &name).await,

        Commands::Verify { command } => match command {
            VerifyCommands::Accept { job_id } => commands::verify::accept(config, &job_id).await,
            VerifyCommands::Stamp {
                job_id,
                decision,
                evidence,
            } => commands::verify::stamp(config, &job_id, decision, evidence.as_deref()).await,
        },

        Commands::Config { .. } => Ok(()),
    }
}
