//! Full-screen unlock form for protected short links.

pub mod effects;
pub mod events;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, Write, stderr};

use anyhow::Result;
use muri_core::access::{Acquirer, Authorizer, LinkRequirement};
use muri_core::config::Config;
pub use runtime::UnlockRuntime;

use crate::state::UnlockState;

/// Runs the interactive unlock form for a protected link.
///
/// Prints the resolved destination to stdout after the terminal is restored
/// so the result survives the alternate screen (and can be piped).
pub async fn run_unlock_form(config: &Config, requirement: LinkRequirement) -> Result<()> {
    // The form requires a terminal to render
    if !stderr().is_terminal() {
        anyhow::bail!(
            "The unlock form requires a terminal.\n\
             Use `muri open --no-tui` with --passcode/--lat/--lon for non-interactive use."
        );
    }

    let authorizer = Authorizer::new(config)?;
    let acquirer = Acquirer::from_config(config);

    let mut err = stderr();
    writeln!(err, "muri — unlocking /r/{}", requirement.alias_path)?;
    err.flush()?;

    let state = UnlockState::new(requirement);
    let mut runtime = UnlockRuntime::new(state, authorizer, acquirer)?;
    runtime.run()?;

    // Terminal restored; report the outcome where it persists.
    if let Some(destination) = &runtime.state.destination {
        println!("{destination}");
    }

    Ok(())
}
