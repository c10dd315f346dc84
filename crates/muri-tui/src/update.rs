//! Unlock form reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(state, event)`
//! and executes the returned effects.
//!
//! This is the single source of truth for how events modify state.

use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use muri_core::access::AuthOutcome;
use tokio_util::sync::CancellationToken;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::{Phase, UnlockState};

/// Effects to run when the form opens.
///
/// Location-only links fetch the coordinate proactively: there is nothing
/// else to collect first, so waiting for a user action would only add a
/// round of friction.
pub fn init(state: &mut UnlockState) -> Vec<UiEffect> {
    if state.requirement.location_required
        && !state.requirement.password_required
        && state.coordinate.is_none()
    {
        return start_location(state);
    }
    vec![]
}

/// The main reducer function.
pub fn update(state: &mut UnlockState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            state.spinner_frame = state.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(state, term_event),
        UiEvent::LocationResolved { attempt, result } => {
            if attempt != state.location_attempt {
                // Stale completion from a superseded attempt; only the live
                // attempt may write the coordinate.
                return vec![];
            }
            state.location_cancel = None;
            match result {
                Ok(coordinate) => {
                    state.coordinate = Some(coordinate);
                    state.last_error = None;
                    if std::mem::take(&mut state.submit_on_location) {
                        return begin_submit(state);
                    }
                    recompute_phase(state);
                    vec![]
                }
                Err(err) => {
                    // An acquisition failure aborts any queued submission
                    // without contacting the server.
                    state.submit_on_location = false;
                    state.last_error = Some(err.message);
                    state.phase = Phase::Error;
                    vec![]
                }
            }
        }
        UiEvent::SubmitFinished { result } => match result {
            Ok(AuthOutcome::Granted(target)) => {
                state.phase = Phase::Done;
                let url = target.url().to_string();
                state.destination = Some(url.clone());
                if target.is_external() {
                    // External destinations open by full navigation; internal
                    // routes are only displayed.
                    return vec![UiEffect::OpenBrowser { url }];
                }
                vec![]
            }
            Ok(AuthOutcome::Rejected { reason }) => {
                state.phase = Phase::Error;
                state.last_error = Some(reason.message().to_string());
                vec![]
            }
            Ok(AuthOutcome::CredentialsRequired(discovered)) => {
                // The server knows better than the inbound URL did; adopt
                // its requirement set and collect what is missing.
                state.requirement = discovered;
                state.last_error =
                    Some("This link is protected; provide the required credentials.".to_string());
                state.phase = Phase::Idle;
                recompute_phase(state);
                init(state)
            }
            Err(err) => {
                state.phase = Phase::Error;
                state.last_error = Some(err.user_message().to_string());
                tracing::warn!(%err, "authorization request failed");
                vec![]
            }
        },
    }
}

fn handle_terminal_event(state: &mut UnlockState, event: Event) -> Vec<UiEffect> {
    let Event::Key(key) = event else {
        return vec![];
    };
    if key.kind != KeyEventKind::Press {
        return vec![];
    }

    // Once done, any key leaves the form.
    if state.phase == Phase::Done {
        return vec![UiEffect::Quit];
    }

    match key.code {
        KeyCode::Esc => return vec![UiEffect::Quit],
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return vec![UiEffect::Quit];
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if state.can_request_location() {
                return start_location(state);
            }
            return vec![];
        }
        _ => {}
    }

    match key.code {
        KeyCode::Enter => request_submit(state),
        KeyCode::Backspace => {
            if state.requirement.password_required && state.phase != Phase::Submitting {
                state.password.pop();
                recompute_phase(state);
            }
            vec![]
        }
        KeyCode::Char(c)
            if state.requirement.password_required && state.phase != Phase::Submitting =>
        {
            state.password.push(c);
            recompute_phase(state);
            vec![]
        }
        _ => vec![],
    }
}

/// Handles an explicit submission request (Enter).
///
/// With the location still unresolved the attempt is queued behind an
/// acquisition rather than refused: the user typed the password faster than
/// the automatic fix completed.
fn request_submit(state: &mut UnlockState) -> Vec<UiEffect> {
    if matches!(state.phase, Phase::Submitting | Phase::Done) {
        return vec![];
    }
    if state.requirement.password_required && state.password.is_empty() {
        return vec![];
    }
    if state.requirement.location_required && state.coordinate.is_none() {
        state.submit_on_location = true;
        if state.phase == Phase::AwaitingLocation {
            // An attempt is already in flight; ride it.
            return vec![];
        }
        return start_location(state);
    }
    begin_submit(state)
}

fn begin_submit(state: &mut UnlockState) -> Vec<UiEffect> {
    state.phase = Phase::Submitting;
    state.last_error = None;
    vec![UiEffect::Submit]
}

/// Starts a fresh acquisition attempt, superseding any in-flight one.
fn start_location(state: &mut UnlockState) -> Vec<UiEffect> {
    let mut effects = Vec::new();
    if let Some(token) = state.location_cancel.take() {
        effects.push(UiEffect::CancelTask { token });
    }
    state.location_attempt += 1;
    let cancel = CancellationToken::new();
    state.location_cancel = Some(cancel.clone());
    state.phase = Phase::AwaitingLocation;
    state.last_error = None;
    effects.push(UiEffect::AcquireLocation {
        attempt: state.location_attempt,
        cancel,
    });
    effects
}

/// Re-derives Idle/ReadyToSubmit from the credential invariant.
///
/// Called after every input change; in-flight phases are left alone.
fn recompute_phase(state: &mut UnlockState) {
    if matches!(
        state.phase,
        Phase::Submitting | Phase::Done | Phase::AwaitingLocation
    ) {
        return;
    }
    state.phase = if state.credentials().satisfies(&state.requirement) {
        Phase::ReadyToSubmit
    } else {
        Phase::Idle
    };
}
