mod commands;
mod ui;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "cdp", about = "Deploy local projects to your Coolify instance")]
#[command(version)]
struct Cli {
    /// Show status changes, docker output and debug logs
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the current directory (default)
    Deploy,
    /// Store Coolify, GitHub and Docker registry credentials
    Login {
        /// Coolify URL, e.g. https://coolify.example.com
        #[arg(long)]
        url: Option<String>,
    },
    /// Remove stored credentials
    Logout,
    /// Check connectivity and configuration
    #[command(alias = "whoami")]
    Health,
    /// Print the logs of the latest deployment
    Logs,
    /// Show the application's status
    #[command(alias = "status")]
    Ls,
    /// Link this directory to an existing Coolify application
    Link,
    /// Redeploy an earlier commit
    Rollback,
    /// Manage application environment variables
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },
    /// Delete the application, project, GitHub repo and local files
    Reset {
        /// Skip confirmation prompts
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum EnvAction {
    /// List variables
    Ls,
    /// Add a variable (KEY=VALUE)
    Add {
        /// Variable in KEY=VALUE format
        key_value: String,
        /// Make the variable available at build time
        #[arg(long)]
        build_time: bool,
    },
    /// Remove a variable
    Rm {
        /// Variable name
        key: String,
    },
    /// Write the application's variables to a .env file
    Pull {
        #[arg(default_value = ".env")]
        file: String,
    },
    /// Upload variables from a .env file
    Push {
        #[arg(default_value = ".env")]
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose || debug_env();

    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli.command.unwrap_or(Commands::Deploy) {
        Commands::Deploy => commands::deploy(verbose, &cancel).await?,
        Commands::Login { url } => commands::login(url).await?,
        Commands::Logout => commands::logout()?,
        Commands::Health => commands::health().await?,
        Commands::Logs => commands::logs().await?,
        Commands::Ls => commands::ls().await?,
        Commands::Link => commands::link().await?,
        Commands::Rollback => commands::rollback(verbose, &cancel).await?,
        Commands::Env { action } => match action {
            EnvAction::Ls => commands::env_ls().await?,
            EnvAction::Add {
                key_value,
                build_time,
            } => commands::env_add(&key_value, build_time).await?,
            EnvAction::Rm { key } => commands::env_rm(&key).await?,
            EnvAction::Pull { file } => commands::env_pull(&file).await?,
            EnvAction::Push { file } => commands::env_push(&file).await?,
        },
        Commands::Reset { yes } => commands::reset(yes).await?,
    }

    Ok(())
}

/// `CDP_DEBUG` set to anything but empty or `0`.
fn debug_env() -> bool {
    std::env::var_os("CDP_DEBUG").is_some_and(|v| !v.is_empty() && v != "0")
}

/// First Ctrl-C cancels the running command; a second one exits.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl-C");
            return;
        }
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
