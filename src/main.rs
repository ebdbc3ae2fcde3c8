use clap::Parser;
use dormancy::{
    config::AppConfig,
    jobs::{self, SyncOptions},
    observability, report,
};

const EXIT_CONFIG: i32 = 2;

/// CLI arguments for dormancy
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Report Tableau Server users who have not logged in recently",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file. Without one, configuration is read from the
    /// environment (and a `.env` file in the working directory, if present)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run a single pass and print the report (default)
    Run {
        /// Collect and print the report without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a pass immediately and then every `schedule.interval_secs`
    Watch {
        /// Collect without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::CheckConfig) => run_check_config(args.config.as_deref()),
        Some(Command::Watch { dry_run }) => run_watch(args.config.as_deref(), dry_run).await,
        Some(Command::Run { dry_run }) => run_once(args.config.as_deref(), dry_run).await,
        None => run_once(args.config.as_deref(), false).await,
    }
}

/// Load configuration from the given file, or from the environment.
///
/// Exits with the configuration error code on failure, before any network call.
fn load_config(explicit_config_path: Option<&str>) -> AppConfig {
    let result = match explicit_config_path {
        Some(path) => {
            // Variables from .env are available for ${VAR} expansion
            if let Err(e) = dotenvy::dotenv()
                && !e.not_found()
            {
                eprintln!("Warning: failed to load .env file: {}", e);
            }
            AppConfig::from_file(path)
        }
        None => AppConfig::from_env(),
    };

    match result {
        Ok(config) => config,
        Err(e) => {
            match explicit_config_path {
                Some(path) => eprintln!("Failed to load config from {}: {}", path, e),
                None => eprintln!("Failed to load config from environment: {}", e),
            }
            std::process::exit(EXIT_CONFIG);
        }
    }
}

fn init_logging(config: &AppConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Warning: {}", e);
    }
}

fn run_check_config(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);
    println!("Configuration OK");
    println!("  server: {}", config.tableau.base_url());
    println!("  api version: {}", config.tableau.api_version);
    println!("  inactivity threshold: {} days", config.report.inactivity_days);
    std::process::exit(0);
}

async fn run_once(explicit_config_path: Option<&str>, dry_run: bool) {
    let config = load_config(explicit_config_path);
    init_logging(&config);

    tracing::info!(
        server = %config.tableau.base_url(),
        inactivity_days = config.report.inactivity_days,
        dry_run,
        "Starting inactivity report"
    );

    match jobs::run_sync(&config, SyncOptions { dry_run }).await {
        Ok(sync_report) => {
            print!("{}", report::render(&sync_report, config.report.print_sites));
            std::process::exit(0);
        }
        Err(e) => {
            if let Some(sync_report) = e.report() {
                print!("{}", report::render(sync_report, config.report.print_sites));
            }
            tracing::error!(error = %e, "Inactivity report failed");
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run_watch(explicit_config_path: Option<&str>, dry_run: bool) {
    let config = load_config(explicit_config_path);
    init_logging(&config);

    tokio::select! {
        _ = jobs::start_sync_worker(config, SyncOptions { dry_run }) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, stopping");
        }
    }
}
