//! Unlock form runtime - owns terminal, runs event loop, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! ## Inbox Pattern
//!
//! The runtime uses an "inbox" pattern for async event collection:
//! - Handlers send `UiEvent`s directly to `inbox_tx`
//! - Runtime drains `inbox_rx` each frame to collect results
//!
//! Acquisition and submission run as spawned tasks; their results arrive in
//! the inbox tagged with whatever identifies them (the acquisition attempt
//! id), never mutating state directly.

use std::io::Stdout;
use std::sync::Arc;

use anyhow::Result;
use crossterm::event;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use muri_core::access::{Acquirer, Authorizer};

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::{Phase, UnlockState};
use crate::{render, terminal, update};

/// Target frame rate while something is in flight (spinner animation).
pub const FRAME_DURATION: std::time::Duration = std::time::Duration::from_millis(33);

/// Poll duration when idle (nothing in flight).
/// Longer timeout reduces CPU usage when nothing is happening.
pub const IDLE_POLL_DURATION: std::time::Duration = std::time::Duration::from_millis(100);

type UiEventSender = mpsc::UnboundedSender<UiEvent>;
type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Full-screen unlock form runtime.
///
/// Owns the terminal and state. Runs the event loop and executes effects.
/// Terminal state is guaranteed to be restored on drop or panic.
pub struct UnlockRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: UnlockState,
    authorizer: Arc<Authorizer>,
    acquirer: Arc<Acquirer>,
    inbox_tx: UiEventSender,
    inbox_rx: UiEventReceiver,
    last_tick: std::time::Instant,
}

impl UnlockRuntime {
    /// Creates a new unlock runtime.
    ///
    /// Must be called from within a tokio runtime; effect handlers spawn
    /// onto it.
    pub fn new(
        state: UnlockState,
        authorizer: Authorizer,
        acquirer: Acquirer,
    ) -> Result<Self> {
        // Set up panic hook BEFORE entering alternate screen
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal()?;

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            state,
            authorizer: Arc::new(authorizer),
            acquirer: Arc::new(acquirer),
            inbox_tx,
            inbox_rx,
            last_tick: std::time::Instant::now(),
        })
    }

    /// Runs the main event loop until the user leaves the form.
    pub fn run(&mut self) -> Result<()> {
        let initial = update::init(&mut self.state);
        self.execute_effects(initial);

        let mut dirty = true; // Start dirty to ensure initial render

        while !self.state.should_quit {
            let events = self.collect_events()?;

            for event in events {
                // Only Tick triggers render - this caps frame rate at tick cadence
                let marks_dirty = matches!(&event, UiEvent::Tick);

                let effects = update::update(&mut self.state, event);
                if marks_dirty {
                    dirty = true;
                }
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| {
                    render::render(&self.state, frame);
                })?;
                dirty = false;
            }
        }

        Ok(())
    }

    /// Collects events from the terminal, the inbox, and the tick timer.
    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        // Fast polling only while something animates.
        let needs_fast_poll = matches!(
            self.state.phase,
            Phase::AwaitingLocation | Phase::Submitting
        );
        let tick_interval = if needs_fast_poll {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        // Drain inbox - all async results arrive here
        while let Ok(event) = self.inbox_rx.try_recv() {
            events.push(event);
        }

        // Poll terminal events:
        // - If we already have events to process, do non-blocking poll
        // - Otherwise, block until the next tick is due
        let time_until_tick = tick_interval.saturating_sub(self.last_tick.elapsed());
        let poll_duration = if events.is_empty() {
            time_until_tick
        } else {
            std::time::Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(std::time::Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = std::time::Instant::now();
        }

        Ok(events)
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.should_quit = true;
            }
            UiEffect::OpenBrowser { url } => {
                let _ = open::that(&url);
            }
            UiEffect::CancelTask { token } => {
                token.cancel();
            }
            UiEffect::AcquireLocation { attempt, cancel } => {
                self.spawn_acquisition(attempt, cancel);
            }
            UiEffect::Submit => {
                self.spawn_submit();
            }
        }
    }

    /// Spawns one acquisition attempt.
    ///
    /// Cancellation only stops the wait; the attempt id check in the reducer
    /// is what guarantees a stale completion never lands.
    fn spawn_acquisition(&self, attempt: u64, cancel: CancellationToken) {
        let tx = self.inbox_tx.clone();
        let acquirer = Arc::clone(&self.acquirer);
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                result = acquirer.acquire() => {
                    let _ = tx.send(UiEvent::LocationResolved { attempt, result });
                }
            }
        });
    }

    fn spawn_submit(&self) {
        let tx = self.inbox_tx.clone();
        let authorizer = Arc::clone(&self.authorizer);
        let requirement = self.state.requirement.clone();
        let credentials = self.state.credentials();
        tokio::spawn(async move {
            let result = authorizer.submit(&requirement, &credentials).await;
            let _ = tx.send(UiEvent::SubmitFinished { result });
        });
    }
}

impl Drop for UnlockRuntime {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}
