//! htrbac - command line access checks
//!
//! ```text
//! htrbac --config rbac.toml check GET /docs/a.txt --auth "Basic Ym9iOmIwYjNyNw=="
//! htrbac --config rbac.toml login bob b0b3r7
//! htrbac --config rbac.toml rules /docs/a.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use htrbac::{App, RbacConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Directory-scoped RBAC checks
#[derive(Parser)]
#[command(name = "htrbac")]
#[command(about = "Check access against cascading .rbac.txt rule files")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "htrbac.toml", env = "HTRBAC_CONFIG")]
    config: PathBuf,

    /// Override the resource root
    #[arg(long, env = "HTRBAC_RESOURCE_ROOT")]
    resource_root: Option<PathBuf>,

    /// Override the domain root
    #[arg(long, env = "HTRBAC_DOMAIN_ROOT")]
    domain_root: Option<PathBuf>,

    /// Enable verbose logging and the solve trace
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decide a request; exits 0 when allowed, 1 when denied
    Check {
        action: String,
        resource: String,
        /// Raw Authorization header
        #[arg(long)]
        auth: Option<String>,
        /// Session cookie value or Cookie header
        #[arg(long)]
        cookie: Option<String>,
    },

    /// Verify a password and print the session cookie
    Login { username: String, password: String },

    /// Print the rules governing a resource, highest priority first
    Rules { resource: String },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},htrbac={}", log_level, log_level).into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .init();

    let mut config = RbacConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    info!("Loaded configuration from {:?}", cli.config);

    // Apply CLI overrides
    if let Some(resource_root) = cli.resource_root {
        config.resource_root = resource_root;
    }
    if let Some(domain_root) = cli.domain_root {
        config.domain_root = domain_root;
    }
    config.verbose |= cli.verbose;

    let app = App::new(config).context("Invalid configuration")?;

    match cli.command {
        Command::Check {
            action,
            resource,
            auth,
            cookie,
        } => {
            let (allowed, decision) =
                app.check_access(&action, &resource, auth.as_deref(), cookie.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(if allowed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Login { username, password } => match app.login(&username, &password)? {
            Some(cookie) => {
                println!("{}", cookie);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("login failed for {:?}", username);
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Rules { resource } => {
            for rule in app.rules_for_resource(&resource)? {
                println!("{}  # {}  {}", rule.brief(), rule.description, rule.resource.description);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
