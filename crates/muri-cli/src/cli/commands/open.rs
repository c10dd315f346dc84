//! Open command: the link-access flow.
//!
//! Resolution order:
//! 1. `--direct` (or config) hands the constructed URL to the browser.
//! 2. An interactive terminal with missing credentials opens the unlock form.
//! 3. Otherwise the check runs prompt-free: flags supply the passcode and
//!    coordinate, acquisition fills a missing coordinate, and a protected
//!    link discovered by probing gets one retry with the announced
//!    requirements.

use std::io::{IsTerminal, stderr};

use anyhow::{Context, Result};
use muri_core::access::{
    self, Acquirer, AuthOutcome, Authorizer, Credentials, GeoCoordinate, LinkRequirement, Source,
    parse_link_input,
};
use muri_core::config::{AccessMode, Config};

pub struct OpenOptions<'a> {
    pub config: &'a Config,
    pub link: &'a str,
    pub passcode: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub no_tui: bool,
    pub direct: bool,
}

pub async fn run(opts: OpenOptions<'_>) -> Result<()> {
    let requirement = parse_link_input(opts.link)?;

    let coordinate = opts
        .lat
        .zip(opts.lon)
        .map(|(latitude, longitude)| GeoCoordinate {
            latitude,
            longitude,
            accuracy_m: None,
            source: Source::Manual,
        });
    let credentials = Credentials {
        passcode: opts.passcode.clone(),
        coordinate,
    };

    let mode = if opts.direct {
        AccessMode::Direct
    } else {
        opts.config.access_mode
    };
    if mode == AccessMode::Direct {
        return run_direct(opts.config, &requirement, credentials).await;
    }

    if use_form(opts.no_tui)
        && requirement.requires_anything()
        && !credentials.satisfies(&requirement)
    {
        return run_form(opts.config, requirement).await;
    }

    run_programmatic(&opts, requirement, credentials).await
}

async fn run_programmatic(
    opts: &OpenOptions<'_>,
    mut requirement: LinkRequirement,
    credentials: Credentials,
) -> Result<()> {
    let authorizer = Authorizer::new(opts.config)?;
    let acquirer = Acquirer::from_config(opts.config);

    let mut discovered_once = false;
    loop {
        if requirement.password_required && credentials.passcode.is_none() {
            if use_form(opts.no_tui) {
                return run_form(opts.config, requirement).await;
            }
            anyhow::bail!(
                "This link requires a passcode. Pass --passcode, or drop --no-tui for the interactive form."
            );
        }

        let outcome =
            access::unlock(&authorizer, &acquirer, &requirement, credentials.clone()).await?;
        match outcome {
            AuthOutcome::Granted(target) => {
                println!("{}", target.url());
                // External destinations open by full navigation; in a pipe
                // we only print.
                if target.is_external() && stderr().is_terminal() {
                    let _ = open::that(target.url().as_str());
                }
                return Ok(());
            }
            AuthOutcome::Rejected { reason } => anyhow::bail!("{}", reason.message()),
            AuthOutcome::CredentialsRequired(discovered) => {
                if discovered_once {
                    anyhow::bail!("The server keeps requesting credentials; giving up.");
                }
                discovered_once = true;
                tracing::debug!(alias = %discovered.alias_path, "link is protected, retrying");
                if use_form(opts.no_tui) && !credentials.satisfies(&discovered) {
                    return run_form(opts.config, discovered).await;
                }
                requirement = discovered;
            }
        }
    }
}

/// Direct mode: construct the URL, let the browser and server do the rest.
/// A required coordinate is still acquired first; the browser cannot.
async fn run_direct(
    config: &Config,
    requirement: &LinkRequirement,
    mut credentials: Credentials,
) -> Result<()> {
    let authorizer = Authorizer::new(config)?;

    if requirement.location_required && credentials.coordinate.is_none() {
        let acquirer = Acquirer::from_config(config);
        credentials.coordinate = Some(acquirer.acquire().await?);
    }

    let url = authorizer.authorize_url(requirement, &credentials);
    println!("{url}");
    open::that(url.as_str()).context("open browser")?;
    Ok(())
}

fn use_form(no_tui: bool) -> bool {
    !no_tui && stderr().is_terminal() && cfg!(feature = "tui")
}

#[cfg(feature = "tui")]
async fn run_form(config: &Config, requirement: LinkRequirement) -> Result<()> {
    muri_tui::run_unlock_form(config, requirement).await
}

#[cfg(not(feature = "tui"))]
async fn run_form(_config: &Config, _requirement: LinkRequirement) -> Result<()> {
    anyhow::bail!("This build has no interactive form; use --no-tui with credential flags.")
}
