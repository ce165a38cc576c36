//! Inbound message dispatch.

use heapless::Vec;

use super::registry::Route;
use super::traits::RoutingLog;
use crate::packet::Publish;
use crate::topic::topic_matches;

/// What happened to a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// The matching handler processed the message.
    Handled,
    /// The matching handler returned an error, which went to the log.
    Failed,
    /// No filter matched; the message was dropped.
    Unmatched,
}

/// Routes inbound messages to the handler of the first matching filter.
///
/// Produced by [`HandlerRegistry::subscribe_all`](super::HandlerRegistry::subscribe_all).
/// The set of routes is frozen: the dispatcher only offers `&self` methods and
/// is `Sync`, so the broker connection may dispatch from any number of threads
/// or tasks at once without locking.
pub struct Dispatcher<'h, const MAX_HANDLERS: usize> {
    routes: Vec<Route<'h>, MAX_HANDLERS>,
    log: &'h dyn RoutingLog,
}

impl<'h, const MAX_HANDLERS: usize> Dispatcher<'h, MAX_HANDLERS> {
    pub(crate) fn new(routes: Vec<Route<'h>, MAX_HANDLERS>, log: &'h dyn RoutingLog) -> Self {
        Self { routes, log }
    }

    /// Finds the route for a topic: the first registered filter that matches.
    pub fn route(&self, topic: &str) -> Option<&Route<'h>> {
        self.routes.iter().find(|route| topic_matches(route.filter(), topic))
    }

    /// Hands `payload` to the handler of the first filter matching `topic`.
    ///
    /// Only that one handler runs, even if later filters match as well.
    /// Handler errors are passed to the [`RoutingLog`] and go no further: the
    /// broker's delivery path has nowhere to report them, and one bad message
    /// must not stop the next from being dispatched.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        let Some(route) = self.route(topic) else {
            self.log.unmatched(topic);
            return DispatchOutcome::Unmatched;
        };

        trace!("dispatching {} to {}", topic, route.filter());

        match route.handler().handle(payload) {
            Ok(()) => DispatchOutcome::Handled,
            Err(err) => {
                self.log.handler_failed(topic, err);
                DispatchOutcome::Failed
            }
        }
    }

    /// Same as [`dispatch`](Self::dispatch), for a delivered [`Publish`].
    pub fn dispatch_message(&self, msg: &Publish<'_>) -> DispatchOutcome {
        self.dispatch(msg.topic, msg.payload)
    }

    /// Get an iterator over the subscribed filters, in match order.
    pub fn filters(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(Route::filter)
    }

    /// Get the number of subscribed filters.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if no filters are subscribed.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
