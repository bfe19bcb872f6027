//! Request/response notifications for observability.
//!
//! The transport publishes a [`RequestSentEvent`] before each attempt and a
//! [`ResponseReceivedEvent`] once the attempt has an outcome. Listeners are
//! registered per [`EventName`] on an [`EventNotifier`] and are called inline,
//! in registration order. A listener that returns an error aborts the call
//! with that error.
//!
//! ```
//! use shipengine::events::{Event, EventName, EventNotifier};
//! use std::sync::Arc;
//!
//! let mut notifier = EventNotifier::new();
//! notifier.register(
//!     EventName::RequestSent,
//!     Arc::new(|event: &Event| -> shipengine::Result<()> {
//!         println!("{}", event.message());
//!         Ok(())
//!     }),
//! );
//! assert_eq!(notifier.listener_count(EventName::RequestSent), 1);
//! ```

use crate::Result;
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// The kinds of event a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    RequestSent,
    ResponseReceived,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::RequestSent => "on_request_sent",
            EventName::ResponseReceived => "on_response_received",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published right before an attempt is dispatched.
#[derive(Debug, Clone)]
pub struct RequestSentEvent {
    pub timestamp: SystemTime,
    /// "Calling the ShipEngine ... API at ..." or "Retrying the ShipEngine ... API at ...".
    pub message: String,
    pub request_id: String,
    pub url: String,
    /// Outbound headers, including the API key.
    pub headers: HeaderMap,
    /// The request envelope.
    pub body: Value,
    /// Zero-based attempt number.
    pub retry: u32,
    pub timeout: Duration,
}

/// Published once an attempt has a response, or has failed at the network level.
#[derive(Debug, Clone)]
pub struct ResponseReceivedEvent {
    pub timestamp: SystemTime,
    pub message: String,
    pub request_id: String,
    pub url: String,
    /// `None` when no response was received.
    pub status_code: Option<StatusCode>,
    pub headers: HeaderMap,
    /// Parsed response body, when it was JSON.
    pub body: Option<Value>,
    pub retry: u32,
    /// Time between dispatch and receipt.
    pub elapsed: Duration,
}

/// An event delivered to listeners.
#[derive(Debug, Clone)]
pub enum Event {
    RequestSent(RequestSentEvent),
    ResponseReceived(ResponseReceivedEvent),
}

impl Event {
    pub fn name(&self) -> EventName {
        match self {
            Event::RequestSent(_) => EventName::RequestSent,
            Event::ResponseReceived(_) => EventName::ResponseReceived,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::RequestSent(event) => &event.message,
            Event::ResponseReceived(event) => &event.message,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            Event::RequestSent(event) => &event.request_id,
            Event::ResponseReceived(event) => &event.request_id,
        }
    }

    pub fn retry(&self) -> u32 {
        match self {
            Event::RequestSent(event) => event.retry,
            Event::ResponseReceived(event) => event.retry,
        }
    }
}

/// Receives events from an [`EventNotifier`].
///
/// Closures of the shape `Fn(&Event) -> Result<()>` implement this trait.
pub trait EventListener: Send + Sync {
    /// Handles one event. Returning an error aborts the current call.
    fn on_event(&self, event: &Event) -> Result<()>;
}

impl<F> EventListener for F
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: &Event) -> Result<()> {
        self(event)
    }
}

/// Forwards events to `tracing` at `debug` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn on_event(&self, event: &Event) -> Result<()> {
        match event {
            Event::RequestSent(sent) => tracing::debug!(
                request_id = %sent.request_id,
                url = %sent.url,
                retry = sent.retry,
                timeout_secs = sent.timeout.as_secs(),
                "{}",
                sent.message
            ),
            Event::ResponseReceived(received) => tracing::debug!(
                request_id = %received.request_id,
                url = %received.url,
                status = received.status_code.map(|status| status.as_u16()),
                retry = received.retry,
                elapsed_ms = received.elapsed.as_millis() as u64,
                "{}",
                received.message
            ),
        }
        Ok(())
    }
}

/// Holds registered listeners and dispatches events to them.
#[derive(Clone, Default)]
pub struct EventNotifier {
    listeners: Vec<(EventName, Arc<dyn EventListener>)>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for events named `event_name`.
    pub fn register(&mut self, event_name: EventName, listener: Arc<dyn EventListener>) {
        self.listeners.push((event_name, listener));
    }

    pub fn listener_count(&self, event_name: EventName) -> usize {
        self.listeners
            .iter()
            .filter(|(name, _)| *name == event_name)
            .count()
    }

    /// Calls every listener registered for `event_name`, in registration order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first listener error.
    pub fn dispatch(&self, event_name: EventName, event: &Event) -> Result<()> {
        for (name, listener) in &self.listeners {
            if *name == event_name {
                listener.on_event(event)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.listeners.iter().map(|(name, _)| *name).collect();
        f.debug_struct("EventNotifier")
            .field("listeners", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Mutex;

    fn request_sent(retry: u32) -> Event {
        Event::RequestSent(RequestSentEvent {
            timestamp: SystemTime::now(),
            message: "Calling the ShipEngine address.validate.v1 API at http://localhost".into(),
            request_id: "req_1".into(),
            url: "http://localhost".into(),
            headers: HeaderMap::new(),
            body: Value::Null,
            retry,
            timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn dispatch_calls_listeners_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = EventNotifier::new();

        for tag in ["first", "second", "third"] {
            let log = log.clone();
            notifier.register(
                EventName::RequestSent,
                Arc::new(move |_: &Event| -> Result<()> {
                    log.lock().unwrap().push(tag);
                    Ok(())
                }),
            );
        }

        notifier
            .dispatch(EventName::RequestSent, &request_sent(0))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn dispatch_only_reaches_matching_listeners() {
        let hits = Arc::new(Mutex::new(0));
        let mut notifier = EventNotifier::new();
        let counter = hits.clone();
        notifier.register(
            EventName::ResponseReceived,
            Arc::new(move |_: &Event| -> Result<()> {
                *counter.lock().unwrap() += 1;
                Ok(())
            }),
        );

        notifier
            .dispatch(EventName::RequestSent, &request_sent(0))
            .unwrap();
        assert_eq!(*hits.lock().unwrap(), 0);
        assert_eq!(notifier.listener_count(EventName::ResponseReceived), 1);
    }

    #[test]
    fn listener_error_stops_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = EventNotifier::new();
        notifier.register(
            EventName::RequestSent,
            Arc::new(|_: &Event| -> Result<()> { Err(Error::generic("listener failed")) }),
        );
        let after = log.clone();
        notifier.register(
            EventName::RequestSent,
            Arc::new(move |_: &Event| -> Result<()> {
                after.lock().unwrap().push("reached");
                Ok(())
            }),
        );

        let err = notifier
            .dispatch(EventName::RequestSent, &request_sent(0))
            .unwrap_err();
        assert_eq!(err.message(), "listener failed");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn event_accessors() {
        let event = request_sent(2);
        assert_eq!(event.name(), EventName::RequestSent);
        assert_eq!(event.request_id(), "req_1");
        assert_eq!(event.retry(), 2);
        assert!(TracingListener.on_event(&event).is_ok());
    }
}
