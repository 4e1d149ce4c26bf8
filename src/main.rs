use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rajdhani::commands::{create, deploy, status, tasks, verify};
use rajdhani::config::Config;
use rajdhani::validation::clap_app_name_validator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rajdhani")]
#[command(about = "Verify student-deployed Rajdhani apps task by task", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Configuration file (default: $RAJDHANI_CONFIG or ./rajdhani.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Task catalog, overriding the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify an app against the task catalog
    Verify {
        /// App name (lowercase letters, digits and dashes)
        #[arg(value_parser = clap_app_name_validator)]
        app: String,

        /// Verify this address instead of the app's configured one
        #[arg(long)]
        base_url: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Record the report in the progress store
        #[arg(long)]
        record: bool,
    },

    /// Deploy an app from its latest commit, verify it and record progress
    Deploy {
        /// App name (lowercase letters, digits and dashes)
        #[arg(value_parser = clap_app_name_validator)]
        app: String,

        /// Verify this address instead of the app's configured one
        #[arg(long)]
        base_url: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a new app with the deploy API
    Create {
        /// App name (lowercase letters, digits and dashes)
        #[arg(value_parser = clap_app_name_validator)]
        app: String,

        /// Git repository the app is built from
        #[arg(long)]
        git_url: String,
    },

    /// List the tasks in catalog order
    Tasks {
        /// Show each task's checks
        #[arg(short = 'c', long)]
        checks: bool,
    },

    /// Show the leaderboard, or one app's progress
    Status {
        /// App to show
        app: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rajdhani={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let mut config = Config::load(cli.global.config.as_deref())?;
    if let Some(catalog) = cli.global.catalog {
        config.catalog = catalog;
    }

    match cli.command {
        Commands::Verify {
            app,
            base_url,
            json,
            record,
        } => verify::execute(&config, &app, base_url.as_deref(), json, record),
        Commands::Deploy {
            app,
            base_url,
            json,
        } => deploy::execute(&config, &app, base_url.as_deref(), json),
        Commands::Create { app, git_url } => create::execute(&config, &app, &git_url),
        Commands::Tasks { checks } => tasks::execute(&config, checks),
        Commands::Status { app } => status::execute(&config, app.as_deref()),
    }
}
