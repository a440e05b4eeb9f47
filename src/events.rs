//! Diagnostic events.
//!
//! A [`Resolver`][crate::resolver::Resolver] publishes an [`Event`] whenever a probe resolves
//! or fails and whenever its cache is flushed. Subscribing is optional: publishing never blocks
//! and never fails, and events sent while nobody listens are dropped.

use std::fmt;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// How a name was (or failed to be) resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    DnsOverHttps,
    WellKnown,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::DnsOverHttps => f.write_str("dns-over-https"),
            Method::WellKnown => f.write_str("well-known"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Resolved {
        method: Method,
        name: String,
        key: String,
    },
    Failed {
        method: Method,
        name: String,
        err: String,
    },
    CacheFlushed,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl EventBus {
    /// Receive every event published from now on. A receiver that falls more than a channel's
    /// worth of events behind skips the oldest ones.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: Event) {
        tracing::debug!(?event, "event");
        // An error only means nobody is subscribed.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers() {
        EventBus::default().emit(Event::CacheFlushed);
    }

    #[tokio::test]
    async fn subscribers_see_later_events() {
        let bus = EventBus::default();
        bus.emit(Event::CacheFlushed);

        let mut rx = bus.subscribe();
        bus.emit(Event::Failed {
            method: Method::WellKnown,
            name: "foo.com".into(),
            err: "no record found".into(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            Event::Failed {
                method: Method::WellKnown,
                name: "foo.com".into(),
                err: "no record found".into(),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn method_names() {
        assert_eq!(Method::DnsOverHttps.to_string(), "dns-over-https");
        assert_eq!(Method::WellKnown.to_string(), "well-known");
    }
}
