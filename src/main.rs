use clap::{Parser, Subcommand};
use remote_backup_agent::config::{self, Config};
use remote_backup_agent::managers::logging::{self, LoggingConfig};
use remote_backup_agent::managers::notification::WebhookNotifier;
use remote_backup_agent::managers::scheduler::Scheduler;
use remote_backup_agent::utils::locker::AgentLock;
use remote_backup_agent::utils::remote::OpenSshConnector;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

/// Configuration could not be loaded, or the agent could not start
const EXIT_CONFIG_ERROR: i32 = 1;
/// `--once` cycle ended with an error
const EXIT_CYCLE_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "remote-backup-agent")]
#[command(about = "Periodically archives a remote directory over SSH into local storage", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "BACKUP_AGENT_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the backup loop (default)
    Run {
        /// Run a single cycle and exit instead of looping
        #[arg(long)]
        once: bool,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console_logging("info");
            error!("Could not load config file {:?}: {}", cli.config, e);
            process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let log_guard = match LoggingConfig::from_settings(&config.logging) {
        Some(logging_config) => match logging::init_logging(&logging_config) {
            Ok(guard) => Some(guard),
            Err(e) => {
                logging::init_console_logging(&config.logging.level);
                error!("Could not set up file logging: {:#}", e);
                process::exit(EXIT_CONFIG_ERROR);
            }
        },
        None => {
            logging::init_console_logging(&config.logging.level);
            None
        }
    };

    let code = match cli.command.unwrap_or(Commands::Run { once: false }) {
        Commands::Validate => {
            info!("Configuration {:?} is valid", cli.config);
            println!("✓ Configuration is valid");
            0
        }
        Commands::Run { once } => run(config, once).await,
    };

    // Flush file logs before exiting
    drop(log_guard);
    process::exit(code);
}

async fn run(config: Config, once: bool) -> i32 {
    let _lock = match AgentLock::acquire(&config.backup.directory) {
        Ok(lock) => lock,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_CONFIG_ERROR;
        }
    };

    let notifier = match WebhookNotifier::new(&config.notifications) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_CONFIG_ERROR;
        }
    };

    OpenSshConnector::check_binaries(config.server.auth);
    let connector = OpenSshConnector::new(config.schedule.command_timeout());

    info!(
        "Backing up {}:{}/{} into {:?}",
        config.server.destination(),
        config.server.directory,
        config.server.target,
        config.backup.directory
    );

    let scheduler = Scheduler::new(config, connector, notifier);

    if once {
        let report = scheduler.run_cycle().await;
        return if report.failed() { EXIT_CYCLE_FAILED } else { 0 };
    }

    scheduler.run_forever().await;
    0
}
