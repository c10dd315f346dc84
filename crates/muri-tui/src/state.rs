//! Unlock form state.
//!
//! One page instance owns all of this exclusively; nothing is shared across
//! sessions. The requirement is parsed once before the form opens and never
//! mutated.

use muri_core::access::{Credentials, GeoCoordinate, LinkRequirement};
use tokio_util::sync::CancellationToken;

/// Form phases.
///
/// `ReadyToSubmit` is recomputed on every input change: whenever all
/// required credentials are present the form becomes submittable, whatever
/// phase it was in before (except mid-submission).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting input; not yet submittable.
    Idle,
    /// A location acquisition attempt is in flight.
    AwaitingLocation,
    /// Every required credential is present.
    ReadyToSubmit,
    /// The authorization request is in flight.
    Submitting,
    /// Last acquisition or submission failed; retry available.
    Error,
    /// Access granted and navigation performed.
    Done,
}

/// State of the unlock form.
pub struct UnlockState {
    /// What this link requires. Immutable for the life of the form.
    pub requirement: LinkRequirement,
    /// Password input (collected iff the link requires one).
    pub password: String,
    /// Resolved coordinate (collected iff the link requires one).
    pub coordinate: Option<GeoCoordinate>,
    pub phase: Phase,
    pub last_error: Option<String>,
    /// Id of the live acquisition attempt. A completion carrying any other
    /// id is stale and discarded, so at most one attempt wins the write.
    pub location_attempt: u64,
    /// Cancellation token of the in-flight attempt, if any.
    pub location_cancel: Option<CancellationToken>,
    /// Submit as soon as the pending acquisition resolves (the user pressed
    /// Enter before auto-location completed).
    pub submit_on_location: bool,
    /// Where the link resolved to, once granted.
    pub destination: Option<String>,
    pub should_quit: bool,
    pub spinner_frame: u8,
}

impl UnlockState {
    pub fn new(requirement: LinkRequirement) -> Self {
        let phase = if requirement.requires_anything() {
            Phase::Idle
        } else {
            Phase::ReadyToSubmit
        };
        let last_error = requirement
            .prior_failure
            .map(|reason| reason.message().to_string());
        Self {
            requirement,
            password: String::new(),
            coordinate: None,
            phase,
            last_error,
            location_attempt: 0,
            location_cancel: None,
            submit_on_location: false,
            destination: None,
            should_quit: false,
            spinner_frame: 0,
        }
    }

    /// Returns the credentials collected so far.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            passcode: self
                .requirement
                .password_required
                .then(|| self.password.clone()),
            coordinate: self.coordinate.clone(),
        }
    }

    /// Submit enablement: never while submitting, never with a required
    /// credential absent.
    pub fn can_submit(&self) -> bool {
        !matches!(self.phase, Phase::Submitting | Phase::Done)
            && self.credentials().satisfies(&self.requirement)
    }

    /// The manual location request is available whenever location is
    /// required and no coordinate is held yet, regardless of automatic
    /// attempts.
    pub fn can_request_location(&self) -> bool {
        self.requirement.location_required
            && self.coordinate.is_none()
            && !matches!(self.phase, Phase::Submitting | Phase::Done)
    }
}
