//! Reply emission for one request.

use crate::{CommandError, CommandResult, OutboundQueue};
use bus_envelope::{AckState, Envelope, Identity, ReplyKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Text of the optional `RECEIVED` reply.
const RECEIVED_TEXT: &str = "Command received";

/// Owns a request for the duration of its handling and publishes its replies.
///
/// Enforces the acknowledgement state machine: at most one `RECEIVED`, any
/// number of `PROGRESS`, exactly one terminal `ACK` or `ERROR`. Anything after
/// the terminal reply is logged and dropped.
pub struct Responder {
    request: Envelope,
    identity: Arc<Identity>,
    outbound: OutboundQueue,
    state: AckState,
}

impl Responder {
    pub fn new(request: Envelope, identity: Arc<Identity>, outbound: OutboundQueue) -> Self {
        Self {
            request,
            identity,
            outbound,
            state: AckState::default(),
        }
    }

    /// The request being answered.
    pub fn request(&self) -> &Envelope {
        &self.request
    }

    /// Current acknowledgement state.
    pub fn state(&self) -> AckState {
        self.state
    }

    /// Publish `RECEIVED`.
    pub fn received(&mut self) {
        self.emit(ReplyKind::Received, RECEIVED_TEXT, None);
    }

    /// Publish a `PROGRESS` update.
    pub fn progress(&mut self, text: &str) {
        self.emit(ReplyKind::Progress, text, None);
    }

    /// Publish the terminal reply for a handler result.
    pub fn finish(&mut self, result: CommandResult) {
        match result {
            Ok(outcome) => self.emit(ReplyKind::Ack, &outcome.message, outcome.data),
            Err(err) => self.fail(&err),
        }
    }

    /// Publish a terminal `ERROR`.
    pub fn fail(&mut self, err: &CommandError) {
        self.emit(ReplyKind::Error, &err.to_string(), None);
    }

    fn emit(&mut self, kind: ReplyKind, text: &str, data: Option<serde_json::Value>) {
        let next = match self.state.advance(kind) {
            Ok(next) => next,
            Err(e) => {
                warn!(
                    command = %self.request.command(),
                    correlation_id = %self.request.correlation_id(),
                    error = %e,
                    "Reply suppressed"
                );
                return;
            }
        };

        let mut reply = Envelope::reply_to(&self.request, &self.identity, kind, text);
        if let Some(data) = data {
            reply = reply.with_data(data);
        }

        debug!(
            command = %self.request.command(),
            correlation_id = %self.request.correlation_id(),
            reply_type = %kind,
            "Queueing reply"
        );

        if let Err(e) = self.outbound.enqueue(reply) {
            warn!(error = %e, "Reply dropped");
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandOutcome, OutboundDrain};

    fn responder() -> (Responder, OutboundDrain) {
        let (queue, drain) = OutboundQueue::new();
        let request = Envelope::request("3dviewer", "", "set_density")
            .with_args("9999", "")
            .with_sender("script_runner")
            .with_sequence(7);
        let identity = Arc::new(Identity::new("3dviewer", "viewer-1").with_component_type("viewer"));
        (Responder::new(request, identity, queue), drain)
    }

    #[test]
    fn test_full_conversation() {
        let (mut responder, mut drain) = responder();

        responder.received();
        responder.progress("working");
        responder.finish(Ok(CommandOutcome::message("done")
            .with_data(serde_json::json!({"density": 500.0}))));

        let replies = drain.drain();
        let kinds: Vec<_> = replies.iter().filter_map(|r| r.reply_kind()).collect();
        assert_eq!(
            kinds,
            vec![ReplyKind::Received, ReplyKind::Progress, ReplyKind::Ack]
        );

        let ack = &replies[2];
        assert_eq!(ack.sender(), "viewer-1");
        assert_eq!(ack.component_type(), "viewer");
        assert_eq!(ack.arg1(), "9999");
        assert_eq!(ack.sequence(), Some(7));
        assert_eq!(ack.correlation_id(), responder.request().correlation_id());
        assert_eq!(ack.reply_text(), "done");
        assert!(ack.data().is_some());
        assert_eq!(responder.state(), AckState::Acknowledged);
    }

    #[test]
    fn test_nothing_after_terminal() {
        let (mut responder, mut drain) = responder();

        responder.fail(&CommandError::Failed("nope".to_string()));
        responder.progress("late");
        responder.finish(Ok(CommandOutcome::message("late ack")));

        let replies = drain.drain();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].reply_kind(), Some(ReplyKind::Error));
        assert_eq!(replies[0].reply_text(), "nope");
        assert_eq!(responder.state(), AckState::Errored);
    }

    #[test]
    fn test_received_only_once() {
        let (mut responder, mut drain) = responder();

        responder.received();
        responder.received();

        assert_eq!(drain.drain().len(), 1);
    }
}
