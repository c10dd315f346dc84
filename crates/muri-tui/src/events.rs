//! UI events consumed by the reducer.
//!
//! Async handlers send these into the runtime's inbox; the runtime drains
//! the inbox each frame and feeds every event through `update`.

use muri_core::access::{AuthError, AuthOutcome, GeoCoordinate, GeoError};

/// Events processed by the reducer.
#[derive(Debug)]
pub enum UiEvent {
    /// Animation/poll tick.
    Tick,
    /// Raw terminal input.
    Terminal(crossterm::event::Event),
    /// A location acquisition attempt finished.
    ///
    /// `attempt` identifies which attempt produced the result; the reducer
    /// discards completions from superseded attempts.
    LocationResolved {
        attempt: u64,
        result: Result<GeoCoordinate, GeoError>,
    },
    /// The authorization request finished.
    SubmitFinished {
        result: Result<AuthOutcome, AuthError>,
    },
}
