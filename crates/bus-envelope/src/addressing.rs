//! Component identity and request addressing.

use crate::{Envelope, DEFAULT_COMPONENT_TYPE};

/// The addresses a component answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Role name (e.g. "3dviewer").
    pub logical_address: String,
    /// Instance name; also used as `sender` on everything this component publishes.
    pub physical_address: String,
    /// Informational component type echoed on the wire.
    pub component_type: String,
}

/// Outcome of matching an inbound envelope against an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// A request for this component.
    Accept,
    /// A reply from some other component.
    Reply,
    /// Published by this component and rebroadcast by the relay.
    SelfEcho,
    /// A request for another role or instance.
    NotForUs,
}

impl Identity {
    /// Create an identity with the default component type.
    pub fn new(logical_address: &str, physical_address: &str) -> Self {
        Self {
            logical_address: logical_address.to_string(),
            physical_address: physical_address.to_string(),
            component_type: DEFAULT_COMPONENT_TYPE.to_string(),
        }
    }

    /// Set the component type.
    pub fn with_component_type(mut self, component_type: &str) -> Self {
        self.component_type = component_type.to_string();
        self
    }

    /// Classify an inbound envelope.
    ///
    /// Self-echo is checked first: the relay rebroadcasts every publish to every
    /// subscriber, including the originator. Replies are never addressed by role;
    /// callers correlate them by id. A request with an empty physical address
    /// targets any instance of the role.
    pub fn classify(&self, envelope: &Envelope) -> Addressing {
        if envelope.sender() == self.physical_address {
            return Addressing::SelfEcho;
        }
        if envelope.is_reply() {
            return Addressing::Reply;
        }
        if envelope.logical_address() != self.logical_address {
            return Addressing::NotForUs;
        }
        let physical = envelope.physical_address();
        if !physical.is_empty() && physical != self.physical_address {
            return Addressing::NotForUs;
        }
        Addressing::Accept
    }
}
