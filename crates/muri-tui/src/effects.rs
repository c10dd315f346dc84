//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent I/O and task spawning only (no direct UI mutations).
//!
//! This keeps the reducer pure: it only mutates state and returns effects,
//! never performs I/O or spawns tasks directly.

use tokio_util::sync::CancellationToken;

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Spawn a location acquisition attempt.
    ///
    /// The attempt id travels with the completion event so the reducer can
    /// discard stale results; the token lets a later attempt cancel this one.
    AcquireLocation {
        attempt: u64,
        cancel: CancellationToken,
    },

    /// Cancel an in-progress task by its token.
    CancelTask { token: CancellationToken },

    /// Submit the authorization request with the collected credentials.
    Submit,

    /// Open a URL in the system browser.
    OpenBrowser { url: String },
}
