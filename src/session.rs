//! Per-user session state: the displayed route list, the microphone gate and
//! the turn driver that ties the interpreter to speech playback.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::debug;

use crate::error::AirResult;
use crate::intent::{self, VoiceIntent};
use crate::interpreter::{Interpreter, VoiceContext, VoiceOutcome};
use crate::model::ScoredRoute;
use crate::traits::{AqiLookup, Geocoder, RouteProvider, SpeechSink};

/// Sequence number attached to an outbound route request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteTicket(u64);

impl RouteTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// The route list currently on display.
///
/// Responses are installed only if their ticket is newer than the one that
/// produced the current list, so a slow earlier request can never replace
/// the result of a later one.
#[derive(Debug, Default)]
pub struct RouteBoard {
    issued: u64,
    applied: Option<RouteTicket>,
    routes: Vec<ScoredRoute>,
}

impl RouteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a new outbound request.
    pub fn issue(&mut self) -> RouteTicket {
        self.issued += 1;
        RouteTicket(self.issued)
    }

    /// Install a resolved route list. Returns false when the response is stale.
    pub fn apply(&mut self, ticket: RouteTicket, routes: Vec<ScoredRoute>) -> bool {
        if let Some(current) = self.applied {
            if ticket <= current {
                debug!(
                    stale = ticket.sequence(),
                    current = current.sequence(),
                    "discarding stale route response"
                );
                return false;
            }
        }
        self.applied = Some(ticket);
        self.routes = routes;
        true
    }

    pub fn routes(&self) -> &[ScoredRoute] {
        &self.routes
    }

    pub fn best(&self) -> Option<&ScoredRoute> {
        self.routes.first()
    }

    pub fn applied(&self) -> Option<RouteTicket> {
        self.applied
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("a speech capture session is already active")]
pub struct CaptureBusy;

/// Allows at most one speech capture session at a time.
#[derive(Debug, Default)]
pub struct CaptureGate {
    active: AtomicBool,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Result<CaptureSession<'_>, CaptureBusy> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| CaptureSession { gate: self })
            .map_err(|_| CaptureBusy)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// An open capture session; dropping it releases the microphone.
#[derive(Debug)]
pub struct CaptureSession<'a> {
    gate: &'a CaptureGate,
}

impl Drop for CaptureSession<'_> {
    fn drop(&mut self) {
        self.gate.active.store(false, Ordering::Release);
    }
}

/// Drives one user's turns: classify, execute, speak, update the board.
pub struct VoiceSession<G, A, R, S> {
    interpreter: Interpreter<G, A, R>,
    speech: S,
    context: VoiceContext,
    board: RouteBoard,
}

impl<G, A, R, S> VoiceSession<G, A, R, S>
where
    G: Geocoder,
    A: AqiLookup,
    R: RouteProvider,
    S: SpeechSink,
{
    pub fn new(interpreter: Interpreter<G, A, R>, speech: S, context: VoiceContext) -> Self {
        Self {
            interpreter,
            speech,
            context,
            board: RouteBoard::new(),
        }
    }

    /// Handle one transcribed utterance and speak the reply.
    pub fn handle_utterance(&mut self, utterance: &str) -> VoiceOutcome {
        let intent = intent::classify(utterance);
        let ticket = matches!(intent, VoiceIntent::RoutePlan { .. }).then(|| self.board.issue());

        let outcome = self.interpreter.execute(intent, &mut self.context);

        if let (Some(ticket), Some(routes)) = (ticket, outcome.routes.as_ref()) {
            self.board.apply(ticket, routes.clone());
        }
        self.speech.speak(&outcome.reply);
        outcome
    }

    /// Typed route request from the form: no speech, same ordering guard.
    pub fn plan_routes(&mut self, start: &str, end: &str) -> AirResult<&[ScoredRoute]> {
        let ticket = self.board.issue();
        let prefs = self.context.preferences;
        let ranked = self.interpreter.plan_route(start, end, &prefs)?;
        self.board.apply(ticket, ranked);
        Ok(self.board.routes())
    }

    pub fn context(&self) -> &VoiceContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut VoiceContext {
        &mut self.context
    }

    pub fn board(&self) -> &RouteBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut RouteBoard {
        &mut self.board
    }
}
