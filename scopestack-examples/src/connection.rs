//! Stand-in service connection
//!
//! No I/O happens: connecting and disconnecting are recorded in a shared
//! [`ConnectionEvents`] log and narrated through `tracing`. On exit the
//! connection reports the pending failure, if any, and lets it propagate.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scopestack::{ResourceFactory, ResourceName, ScopeError, ScopeResult, ScopedResource};
use tracing::{info, warn};

/// Something a connection did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Connection established
    Connected {
        /// Service name
        service: String,
    },
    /// Connection closed
    Disconnected {
        /// Service name
        service: String,
    },
    /// A failure was pending when the connection closed
    FailureObserved {
        /// Service name
        service: String,
        /// Failure kind
        kind: String,
        /// Failure message
        message: String,
    },
}

impl ConnectionEvent {
    /// Short label: `connect`, `disconnect` or `failure`.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connect",
            Self::Disconnected { .. } => "disconnect",
            Self::FailureObserved { .. } => "failure",
        }
    }
}

/// Shared, ordered log of connection events.
#[derive(Debug, Clone, Default)]
pub struct ConnectionEvents {
    events: Arc<Mutex<Vec<ConnectionEvent>>>,
}

impl ConnectionEvents {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<ConnectionEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an event.
    pub fn record(&self, event: ConnectionEvent) {
        self.guard().push(event);
    }

    /// Snapshot of every event so far.
    pub fn snapshot(&self) -> Vec<ConnectionEvent> {
        self.guard().clone()
    }

    /// Number of events with the given label.
    pub fn count(&self, label: &str) -> usize {
        self.guard().iter().filter(|event| event.label() == label).count()
    }

    /// Forgets every event.
    pub fn clear(&self) {
        self.guard().clear();
    }
}

/// An open stand-in connection.
#[derive(Debug)]
pub struct ServiceConnection {
    service: String,
    events: ConnectionEvents,
}

impl ServiceConnection {
    /// Name of the connected service.
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl ScopedResource for ServiceConnection {
    fn teardown(&mut self, pending: Option<&ScopeError>) -> ScopeResult<()> {
        info!(service = %self.service, "[Conn] disconnected from {}", self.service);
        self.events.record(ConnectionEvent::Disconnected {
            service: self.service.clone(),
        });

        if let Some(failure) = pending {
            warn!(
                service = %self.service,
                kind = failure.kind(),
                " -> failure observed while disconnecting: {} - {}",
                failure.kind(),
                failure.message()
            );
            self.events.record(ConnectionEvent::FailureObserved {
                service: self.service.clone(),
                kind: failure.kind().to_string(),
                message: failure.message(),
            });
        }
        Ok(())
    }
}

/// Opens a [`ServiceConnection`].
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    name: ResourceName,
    service: String,
    events: ConnectionEvents,
}

impl ConnectionFactory {
    /// Connection to `service`, tracked under `name`, recording into `events`.
    pub fn new(name: ResourceName, service: impl Into<String>, events: &ConnectionEvents) -> Self {
        Self {
            name,
            service: service.into(),
            events: events.clone(),
        }
    }
}

impl ResourceFactory for ConnectionFactory {
    type Resource = ServiceConnection;

    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    fn acquire(self) -> ScopeResult<ServiceConnection> {
        info!(service = %self.service, "[Conn] connection to {} established", self.service);
        self.events.record(ConnectionEvent::Connected {
            service: self.service.clone(),
        });
        Ok(ServiceConnection {
            service: self.service,
            events: self.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopestack::{ContextStack, ExitDecision};
    use tracing_test::traced_test;

    fn factory(events: &ConnectionEvents) -> ConnectionFactory {
        ConnectionFactory::new(ResourceName::try_new("connection").unwrap(), "Server X", events)
    }

    #[test]
    fn test_clean_exit_records_connect_and_disconnect() {
        let events = ConnectionEvents::new();
        let mut stack = ContextStack::new();
        let conn = stack.enter(factory(&events)).unwrap();
        assert_eq!(stack.get(conn).unwrap().service(), "Server X");
        stack.exit(None).unwrap();

        let labels: Vec<_> = events.snapshot().iter().map(ConnectionEvent::label).collect();
        assert_eq!(labels, vec!["connect", "disconnect"]);
    }

    #[test]
    #[traced_test]
    fn test_pending_failure_is_observed_and_propagated() {
        let events = ConnectionEvents::new();
        let mut connection = factory(&events).acquire().unwrap();
        let failure = ScopeError::processing("boom");

        connection.teardown(Some(&failure)).unwrap();

        assert_eq!(connection.decide(Some(&failure)), ExitDecision::Propagate);
        assert_eq!(events.count("disconnect"), 1);
        assert_eq!(
            events.snapshot().last(),
            Some(&ConnectionEvent::FailureObserved {
                service: "Server X".to_string(),
                kind: "ProcessingError".to_string(),
                message: "boom".to_string(),
            })
        );
        assert!(logs_contain("failure observed while disconnecting"));
    }
}
