//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use muri_core::config;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "muri")]
#[command(version = "1.0")]
#[command(about = "Terminal client for the getmyuri link shortener")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the service base URL
    #[arg(long, global = true, env = "MURI_BASE_URL")]
    base_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Open a short link, unlocking it if protected
    Open {
        /// Short link, unlock-page URL, or bare alias (e.g. "docs/launch")
        link: String,

        /// Passcode for password-protected links (skips the form)
        #[arg(long)]
        passcode: Option<String>,

        /// Latitude for geofenced links (skips acquisition)
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude for geofenced links (skips acquisition)
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Never open the full-screen form; fail if credentials are missing
        #[arg(long = "no-tui")]
        no_tui: bool,

        /// Hand the URL to the browser and let the server redirect
        #[arg(long)]
        direct: bool,
    },

    /// Shorten a destination URL with an auto-generated alias
    Shorten {
        /// Destination URL (scheme optional)
        url: String,
    },

    /// Create a customized link (requires login)
    Create {
        /// Destination URL (scheme optional)
        url: String,

        /// Alias segment; repeat for nested aliases (min. 3 characters each)
        #[arg(long = "alias", required = true)]
        aliases: Vec<String>,

        /// Passcode visitors must enter
        #[arg(long)]
        passcode: Option<String>,

        /// Expiry in MST, formatted YYYY-MM-DD HH:MM
        #[arg(long, value_name = "WHEN")]
        expires: Option<String>,

        /// Geofence center latitude
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Geofence center longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Geofence radius
        #[arg(long, default_value_t = 1.0)]
        radius: f64,

        /// Radius unit: miles or feet
        #[arg(long, default_value = "miles")]
        unit: String,
    },

    /// Mark this client as signed in
    Login,

    /// Clear the signed-in marker
    Logout,

    /// Show session status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
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

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = config::Config::load().context("load config")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = Some(base_url);
    }

    let _log_guard = logging::init();

    match cli.command {
        Commands::Open {
            link,
            passcode,
            lat,
            lon,
            no_tui,
            direct,
        } => {
            commands::open::run(commands::open::OpenOptions {
                config: &config,
                link: &link,
                passcode,
                lat,
                lon,
                no_tui,
                direct,
            })
            .await
        }

        Commands::Shorten { url } => commands::shorten::run(&config, &url).await,

        Commands::Create {
            url,
            aliases,
            passcode,
            expires,
            lat,
            lon,
            radius,
            unit,
        } => {
            commands::create::run(commands::create::CreateOptions {
                config: &config,
                url: &url,
                aliases,
                passcode,
                expires,
                lat,
                lon,
                radius,
                unit: &unit,
            })
            .await
        }

        Commands::Login => commands::session::login(),
        Commands::Logout => commands::session::logout(),
        Commands::Status => {
            commands::session::status();
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
