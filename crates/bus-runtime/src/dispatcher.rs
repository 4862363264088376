//! Inbound routing.
//!
//! Runs on the I/O thread. Decodes each payload, discards what is not ours,
//! claims replies, and routes requests to their handler.

use crate::executor::OwnerHandoff;
use crate::registry::panic_reason;
use crate::{Binding, CommandError, CommandRegistry, Invocation, OutboundQueue, PendingRequests, Responder};
use bus_envelope::{Addressing, Envelope, Identity};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Observer for replies nobody was waiting on.
pub type DeliveryHook = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// What the dispatcher did with one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not a valid envelope.
    Undecodable,
    /// Our own publish coming back from the relay.
    SelfEcho,
    /// Addressed to another role or instance.
    NotForUs,
    /// A reply that completed a pending request.
    Completed,
    /// A reply handed to the delivery hook, or dropped if there is none.
    Delivered,
    /// Ran on the I/O thread.
    Executed,
    /// Queued for the owner thread.
    HandedOff,
    /// Answered with `ERROR` without running a handler.
    Rejected,
}

/// Routes decoded envelopes.
pub struct Dispatcher<C> {
    identity: Arc<Identity>,
    registry: Arc<CommandRegistry<C>>,
    outbound: OutboundQueue,
    owner: Option<OwnerHandoff>,
    pending: PendingRequests,
    hook: Option<DeliveryHook>,
    send_received: bool,
}

impl<C> Dispatcher<C> {
    pub(crate) fn new(
        identity: Arc<Identity>,
        registry: Arc<CommandRegistry<C>>,
        outbound: OutboundQueue,
        owner: Option<OwnerHandoff>,
        pending: PendingRequests,
    ) -> Self {
        Self {
            identity,
            registry,
            outbound,
            owner,
            pending,
            hook: None,
            send_received: true,
        }
    }

    pub(crate) fn with_hook(mut self, hook: Option<DeliveryHook>) -> Self {
        self.hook = hook;
        self
    }

    pub(crate) fn with_send_received(mut self, send_received: bool) -> Self {
        self.send_received = send_received;
        self
    }

    /// Handle one raw payload.
    pub fn dispatch(&self, payload: &str) -> Disposition {
        let envelope = match Envelope::from_json(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable payload");
                return Disposition::Undecodable;
            }
        };

        match self.identity.classify(&envelope) {
            Addressing::SelfEcho => {
                trace!(command = %envelope.command(), "Ignoring self-echo");
                Disposition::SelfEcho
            }
            Addressing::NotForUs => {
                trace!(
                    command = %envelope.command(),
                    component = %envelope.logical_address(),
                    "Not addressed to us"
                );
                Disposition::NotForUs
            }
            Addressing::Reply => self.deliver(envelope),
            Addressing::Accept => self.route(envelope),
        }
    }

    fn deliver(&self, reply: Envelope) -> Disposition {
        if self.pending.complete(&reply) {
            return Disposition::Completed;
        }
        if let Some(hook) = &self.hook {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook(&reply))) {
                error!(
                    command = %reply.command(),
                    correlation_id = %reply.correlation_id(),
                    reason = %panic_reason(payload.as_ref()),
                    "Delivery hook panicked"
                );
            }
        }
        Disposition::Delivered
    }

    fn route(&self, request: Envelope) -> Disposition {
        debug!(
            command = %request.command(),
            sender = %request.sender(),
            correlation_id = %request.correlation_id(),
            "Request received"
        );

        let binding = self.registry.binding(request.command());
        let mut responder = Responder::new(request, self.identity.clone(), self.outbound.clone());
        if self.send_received {
            responder.received();
        }

        match binding {
            None => {
                let command = responder.request().command().to_string();
                responder.fail(&CommandError::UnknownCommand(command));
                Disposition::Rejected
            }
            Some(Binding::Inline) => {
                let result = {
                    let mut invocation = Invocation::live(&mut responder);
                    self.registry.execute_inline(&mut invocation)
                };
                responder.finish(result);
                Disposition::Executed
            }
            Some(Binding::Owner) => match &self.owner {
                Some(owner) => match owner.hand_off(responder) {
                    Ok(()) => Disposition::HandedOff,
                    Err(mut responder) => {
                        responder.fail(&CommandError::Failed("Owner thread unavailable".to_string()));
                        Disposition::Rejected
                    }
                },
                None => {
                    responder.fail(&CommandError::Failed("No owner thread attached".to_string()));
                    Disposition::Rejected
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandOutcome, OutboundDrain, OwnerInbox};
    use bus_envelope::ReplyKind;
    use std::sync::Mutex;

    struct Fixture {
        dispatcher: Dispatcher<u32>,
        inbox: OwnerInbox<u32>,
        outbound: OutboundDrain,
        pending: PendingRequests,
        delivered: Arc<Mutex<Vec<Envelope>>>,
    }

    fn fixture(send_received: bool) -> Fixture {
        let mut registry = CommandRegistry::new();
        registry.register_inline("ping", |_inv: &mut Invocation<'_>| {
            Ok(CommandOutcome::message("pong"))
        });
        registry.register_inline("echo", |inv: &mut Invocation<'_>| {
            Ok(CommandOutcome::message(format!("{}|{}", inv.arg1(), inv.arg2())))
        });
        registry.register_owner("bump", |count: &mut u32, inv: &mut Invocation<'_>| {
            *count += inv.arg1().parse::<u32>().unwrap_or(1);
            Ok(CommandOutcome::message(format!("count {}", count)))
        });
        let registry = Arc::new(registry);

        let (queue, outbound) = OutboundQueue::new();
        let (handoff, inbox) = OwnerInbox::new(registry.clone());
        let pending = PendingRequests::new();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();

        let dispatcher = Dispatcher::new(
            Arc::new(Identity::new("3dviewer", "viewer-1")),
            registry,
            queue,
            Some(handoff),
            pending.clone(),
        )
        .with_send_received(send_received)
        .with_hook(Some(Arc::new(move |env: &Envelope| {
            sink.lock().unwrap().push(env.clone())
        })));

        Fixture {
            dispatcher,
            inbox,
            outbound,
            pending,
            delivered,
        }
    }

    fn request(component: &str, phys: &str, command: &str) -> String {
        Envelope::request(component, phys, command)
            .with_sender("script_runner")
            .to_json()
            .unwrap()
    }

    fn kinds(drain: &mut OutboundDrain) -> Vec<ReplyKind> {
        drain.drain().iter().filter_map(|e| e.reply_kind()).collect()
    }

    #[test]
    fn test_inline_command_gets_received_then_ack() {
        let mut f = fixture(true);
        let disposition = f.dispatcher.dispatch(&request("3dviewer", "", "ping"));
        assert_eq!(disposition, Disposition::Executed);
        assert_eq!(kinds(&mut f.outbound), vec![ReplyKind::Received, ReplyKind::Ack]);
    }

    #[test]
    fn test_received_can_be_disabled() {
        let mut f = fixture(false);
        f.dispatcher.dispatch(&request("3dviewer", "", "ping"));
        assert_eq!(kinds(&mut f.outbound), vec![ReplyKind::Ack]);
    }

    #[test]
    fn test_owner_command_is_handed_off() {
        let mut f = fixture(true);
        let disposition = f.dispatcher.dispatch(&request("3dviewer", "", "bump"));
        assert_eq!(disposition, Disposition::HandedOff);
        assert_eq!(kinds(&mut f.outbound), vec![ReplyKind::Received]);

        let mut count = 0;
        assert_eq!(f.inbox.drain(&mut count), 1);
        assert_eq!(count, 1);
        assert_eq!(kinds(&mut f.outbound), vec![ReplyKind::Ack]);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let mut f = fixture(true);
        let disposition = f.dispatcher.dispatch(&request("3dviewer", "", "fly"));
        assert_eq!(disposition, Disposition::Rejected);

        let replies = f.outbound.drain();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].reply_kind(), Some(ReplyKind::Error));
        assert_eq!(replies[1].reply_text(), "Unknown command: fly");
    }

    #[test]
    fn test_filtering() {
        let mut f = fixture(true);

        assert_eq!(f.dispatcher.dispatch("not json"), Disposition::Undecodable);
        assert_eq!(
            f.dispatcher.dispatch(&request("other_role", "", "ping")),
            Disposition::NotForUs
        );
        assert_eq!(
            f.dispatcher.dispatch(&request("3dviewer", "viewer-2", "ping")),
            Disposition::NotForUs
        );

        let echo = Envelope::request("3dviewer", "", "ping")
            .with_sender("viewer-1")
            .to_json()
            .unwrap();
        assert_eq!(f.dispatcher.dispatch(&echo), Disposition::SelfEcho);

        assert!(f.outbound.drain().is_empty());
        assert_eq!(
            f.dispatcher.dispatch(&request("3dviewer", "viewer-1", "ping")),
            Disposition::Executed
        );
    }

    #[test]
    fn test_replies_complete_pending_or_reach_hook() {
        let f = fixture(true);
        let asked = Envelope::request("other_role", "", "status");
        let rx = f.pending.register(asked.correlation_id());
        let other = Identity::new("other_role", "other-1");

        let ack = Envelope::reply_to(&asked, &other, ReplyKind::Ack, "fine");
        assert_eq!(
            f.dispatcher.dispatch(&ack.to_json().unwrap()),
            Disposition::Completed
        );
        drop(rx);

        let stray = Envelope::reply_to(
            &Envelope::request("other_role", "", "status"),
            &other,
            ReplyKind::Ack,
            "late",
        );
        assert_eq!(
            f.dispatcher.dispatch(&stray.to_json().unwrap()),
            Disposition::Delivered
        );
        assert_eq!(f.delivered.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_loosely_typed_payloads_get_one_terminal_reply() {
        let payloads = [
            (
                r#"{"component":"3dviewer","sender":"script_runner","command":"echo",
                    "arg1":"primary","arg2":9999,"UUID":"u1"}"#,
                "primary|9999",
            ),
            (
                r#"{"component":"3dviewer","comp_phys":null,"sender":null,"command":"echo",
                    "arg1":-2.5,"arg2":null,"UUID":"u2","tick count":1.5}"#,
                "-2.5|",
            ),
            (
                r#"{"component":"3dviewer","sender":"script_runner","command":"echo",
                    "arg1":true,"UUID":"u3","tick count":"12"}"#,
                "true|",
            ),
        ];

        for (payload, expected) in payloads {
            let mut f = fixture(true);
            assert_eq!(f.dispatcher.dispatch(payload), Disposition::Executed, "{}", payload);

            let replies = f.outbound.drain();
            let kinds: Vec<_> = replies.iter().filter_map(|r| r.reply_kind()).collect();
            assert_eq!(kinds, vec![ReplyKind::Received, ReplyKind::Ack], "{}", payload);
            assert_eq!(replies[1].reply_text(), expected);
            assert_eq!(
                replies.iter().filter(|r| r.is_terminal()).count(),
                1,
                "{}",
                payload
            );
        }
    }

    #[test]
    fn test_loosely_typed_owner_payload() {
        let mut f = fixture(true);
        let payload = r#"{"component":"3dviewer","sender":"script_runner","command":"bump",
            "arg1":3,"UUID":"u4","tick count":"7.0"}"#;

        assert_eq!(f.dispatcher.dispatch(payload), Disposition::HandedOff);
        assert_eq!(kinds(&mut f.outbound), vec![ReplyKind::Received]);

        let mut count = 0;
        f.inbox.drain(&mut count);
        assert_eq!(count, 3);

        let replies = f.outbound.drain();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].reply_kind(), Some(ReplyKind::Ack));
        assert_eq!(replies[0].sequence(), Some(7));
    }

    #[test]
    fn test_panicking_hook_does_not_escape() {
        let (queue, mut outbound) = OutboundQueue::new();
        let mut registry: CommandRegistry<u32> = CommandRegistry::new();
        registry.register_inline("ping", |_inv: &mut Invocation<'_>| {
            Ok(CommandOutcome::message("pong"))
        });
        let dispatcher = Dispatcher::new(
            Arc::new(Identity::new("3dviewer", "viewer-1")),
            Arc::new(registry),
            queue,
            None,
            PendingRequests::new(),
        )
        .with_hook(Some(Arc::new(|_env: &Envelope| panic!("hook broke"))));

        let stray = Envelope::reply_to(
            &Envelope::request("other_role", "", "status"),
            &Identity::new("other_role", "other-1"),
            ReplyKind::Ack,
            "late",
        );
        assert_eq!(
            dispatcher.dispatch(&stray.to_json().unwrap()),
            Disposition::Delivered
        );

        assert_eq!(
            dispatcher.dispatch(&request("3dviewer", "", "ping")),
            Disposition::Executed
        );
        assert_eq!(kinds(&mut outbound), vec![ReplyKind::Received, ReplyKind::Ack]);
    }

    #[test]
    fn test_dropped_owner_inbox_rejects_owner_commands() {
        let Fixture {
            dispatcher,
            inbox,
            mut outbound,
            ..
        } = fixture(true);
        drop(inbox);

        assert_eq!(
            dispatcher.dispatch(&request("3dviewer", "", "bump")),
            Disposition::Rejected
        );
        let replies = outbound.drain();
        assert_eq!(
            replies.last().map(|r| r.reply_text()),
            Some("Owner thread unavailable")
        );

        // Inline commands are unaffected.
        assert_eq!(
            dispatcher.dispatch(&request("3dviewer", "", "ping")),
            Disposition::Executed
        );
    }

    #[test]
    fn test_no_owner_attached() {
        let (queue, mut outbound) = OutboundQueue::new();
        let mut registry: CommandRegistry<u32> = CommandRegistry::new();
        registry.register_owner("bump", |_c: &mut u32, _inv: &mut Invocation<'_>| {
            Ok(CommandOutcome::message("unreachable"))
        });
        let dispatcher = Dispatcher::new(
            Arc::new(Identity::new("3dviewer", "viewer-1")),
            Arc::new(registry),
            queue,
            None,
            PendingRequests::new(),
        );

        assert_eq!(
            dispatcher.dispatch(&request("3dviewer", "", "bump")),
            Disposition::Rejected
        );
        let replies = outbound.drain();
        assert_eq!(
            replies.last().map(|r| r.reply_text()),
            Some("No owner thread attached")
        );
    }
}
