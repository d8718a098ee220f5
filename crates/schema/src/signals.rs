//! Lifecycle notifications
//!
//! A `Signals` hub is created once per registry and handed to every schema
//! type built against it. Subscribers connect to one `SignalKind` and are
//! called synchronously, in connection order, with the event payload. The
//! first subscriber error stops delivery and propagates to whoever fired
//! the event.

use crate::instance::SchemaInstance;
use crate::schema::SchemaRef;
use crate::typed::TypedValue;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stratadoc_core::Result;

/// Event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Before an instance is initialized
    PreInit,
    /// After an instance is initialized
    PostInit,
    /// Before a document is saved
    PreSave,
    /// After a document is saved
    PostSave,
    /// Before a document is deleted
    PreDelete,
    /// After a document is deleted
    PostDelete,
    /// A schema type has been built
    TypeConstructed,
}

/// Event payloads
#[derive(Clone, Copy)]
pub enum Event<'a> {
    /// Keyword arguments an instance is about to be initialized with
    PreInit {
        /// Instance type
        sender: &'a SchemaRef,
        /// Field assignments, in call order
        kwargs: &'a [(String, TypedValue)],
    },
    /// Instance finished initializing
    PostInit {
        /// Instance type
        sender: &'a SchemaRef,
        /// The new instance
        instance: &'a SchemaInstance,
    },
    /// Document about to be saved
    PreSave {
        /// Document type
        sender: &'a SchemaRef,
        /// The document
        instance: &'a SchemaInstance,
    },
    /// Document saved
    PostSave {
        /// Document type
        sender: &'a SchemaRef,
        /// The document
        instance: &'a SchemaInstance,
        /// No id was resolvable before the save
        created: bool,
    },
    /// Document about to be deleted
    PreDelete {
        /// Document type
        sender: &'a SchemaRef,
        /// The document
        instance: &'a SchemaInstance,
    },
    /// Document deleted
    PostDelete {
        /// Document type
        sender: &'a SchemaRef,
        /// The document
        instance: &'a SchemaInstance,
    },
    /// Schema type built and catalogued
    TypeConstructed {
        /// The new type
        class: &'a SchemaRef,
    },
}

impl<'a> Event<'a> {
    /// Which signal this payload belongs to
    pub fn kind(&self) -> SignalKind {
        match self {
            Event::PreInit { .. } => SignalKind::PreInit,
            Event::PostInit { .. } => SignalKind::PostInit,
            Event::PreSave { .. } => SignalKind::PreSave,
            Event::PostSave { .. } => SignalKind::PostSave,
            Event::PreDelete { .. } => SignalKind::PreDelete,
            Event::PostDelete { .. } => SignalKind::PostDelete,
            Event::TypeConstructed { .. } => SignalKind::TypeConstructed,
        }
    }

    /// Type the event concerns
    pub fn sender(&self) -> &'a SchemaRef {
        match *self {
            Event::PreInit { sender, .. }
            | Event::PostInit { sender, .. }
            | Event::PreSave { sender, .. }
            | Event::PostSave { sender, .. }
            | Event::PreDelete { sender, .. }
            | Event::PostDelete { sender, .. } => sender,
            Event::TypeConstructed { class } => class,
        }
    }

    /// Instance carried by the event, if any
    pub fn instance(&self) -> Option<&'a SchemaInstance> {
        match *self {
            Event::PostInit { instance, .. }
            | Event::PreSave { instance, .. }
            | Event::PostSave { instance, .. }
            | Event::PreDelete { instance, .. }
            | Event::PostDelete { instance, .. } => Some(instance),
            Event::PreInit { .. } | Event::TypeConstructed { .. } => None,
        }
    }
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind())
            .field("sender", &self.sender().qualified_name())
            .finish()
    }
}

/// Subscriber callback
pub type Handler = Arc<dyn Fn(&Event<'_>) -> Result<()> + Send + Sync>;

/// Notification hub
#[derive(Default)]
pub struct Signals {
    handlers: RwLock<HashMap<SignalKind, Vec<Handler>>>,
}

impl Signals {
    /// Create a hub with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `kind`
    pub fn connect<F>(&self, kind: SignalKind, handler: F)
    where
        F: Fn(&Event<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Number of subscribers connected to `kind`
    pub fn receiver_count(&self, kind: SignalKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its kind
    ///
    /// Delivery works on a snapshot of the subscriber list taken under the
    /// lock, so a subscriber may itself connect new subscribers.
    pub fn send(&self, event: &Event<'_>) -> Result<()> {
        let snapshot: Vec<Handler> = match self.handlers.read().get(&event.kind()) {
            Some(handlers) => handlers.clone(),
            None => return Ok(()),
        };
        for handler in snapshot {
            handler(event)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let mut counts: Vec<_> = handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort_by_key(|(k, _)| format!("{:?}", k));
        f.debug_struct("Signals").field("handlers", &counts).finish()
    }
}
