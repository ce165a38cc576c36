//! Handler registration and subscription.

use heapless::Vec;

use super::dispatcher::Dispatcher;
use super::traits::{HandlerCollector, MessageHandler, RoutingLog, Subscriber};
use crate::error::{RegistryError, SubscribeError, TopicError};
use crate::packet::{DEFAULT_QOS, QoS};
use crate::topic::{self, MAX_TOPIC_LEN, TopicString};
use crate::transport::BrokerConnection;

/// Options applied to every subscription made by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubscribeOptions {
    pub qos: QoS,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self { qos: DEFAULT_QOS }
    }
}

/// A registered filter and the handler it routes to.
pub struct Route<'h> {
    filter: TopicString,
    handler: &'h dyn MessageHandler,
}

impl<'h> Route<'h> {
    pub fn filter(&self) -> &str {
        self.filter.as_str()
    }

    pub(crate) fn handler(&self) -> &'h dyn MessageHandler {
        self.handler
    }
}

/// An ordered registry of `(filter, handler)` pairs.
///
/// This is the building phase of routing: handlers can be added, nothing is
/// subscribed yet. [`subscribe_all`](Self::subscribe_all) consumes the
/// registry and returns the read-only [`Dispatcher`], so registration after
/// activation is impossible by construction.
///
/// Filters are kept in registration order, which is also match priority.
///
/// # Example
///
/// ```ignore
/// let mut registry = HandlerRegistry::<8>::new();
/// registry.register(&firmware_subscriber)?;
/// registry.register_handler("devices/+/event/+/from/api", &on_api_event)?;
///
/// let dispatcher = registry.subscribe_all(&connection, &log).await?;
/// ```
pub struct HandlerRegistry<'h, const MAX_HANDLERS: usize> {
    routes: Vec<Route<'h>, MAX_HANDLERS>,
    options: SubscribeOptions,
}

impl<'h, const MAX_HANDLERS: usize> HandlerRegistry<'h, MAX_HANDLERS> {
    /// Create a new empty registry subscribing with the default QoS.
    pub fn new() -> Self {
        Self::with_options(SubscribeOptions::default())
    }

    pub fn with_options(options: SubscribeOptions) -> Self {
        Self {
            routes: Vec::new(),
            options,
        }
    }

    /// Routes messages matching `filter` to `handler`.
    ///
    /// Registering a filter that is already present replaces its handler and
    /// keeps its original position.
    ///
    /// Returns an error if the filter is invalid, including a `#` that is not
    /// the last level, or if the registry is full.
    pub fn register_handler(
        &mut self,
        filter: &str,
        handler: &'h dyn MessageHandler,
    ) -> Result<(), RegistryError> {
        topic::validate_filter(filter)?;

        if let Some(route) = self.routes.iter_mut().find(|r| r.filter.as_str() == filter) {
            debug!("replacing handler for filter {}", filter);
            route.handler = handler;
            return Ok(());
        }

        let mut owned = TopicString::new();
        owned.push_str(filter).map_err(|_| {
            RegistryError::Topic(TopicError::TooLong {
                max: MAX_TOPIC_LEN,
                actual: filter.len(),
            })
        })?;

        self.routes
            .push(Route {
                filter: owned,
                handler,
            })
            .map_err(|_| RegistryError::Full {
                capacity: MAX_HANDLERS,
            })
    }

    /// Lets a subscriber component add all of its handlers.
    pub fn register(&mut self, subscriber: &'h dyn Subscriber) -> Result<(), RegistryError> {
        subscriber.register(self)
    }

    /// Get an iterator over the registered filters, in match order.
    pub fn filters(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(Route::filter)
    }

    /// Get the number of registered filters.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Subscribes every registered filter and activates dispatch.
    ///
    /// Subscriptions are made one at a time in registration order, each
    /// waiting for the broker's acknowledgment. The first failure aborts the
    /// remaining subscriptions and is returned together with its filter.
    /// Subscriptions that already succeeded are not undone; callers should
    /// disconnect rather than retry on the same session.
    pub async fn subscribe_all<C>(
        self,
        connection: &C,
        log: &'h dyn RoutingLog,
    ) -> Result<Dispatcher<'h, MAX_HANDLERS>, SubscribeError<C::Error>>
    where
        C: BrokerConnection,
    {
        for route in self.routes.iter() {
            if let Err(source) = connection.subscribe(route.filter(), self.options.qos).await {
                warn!("subscribe to {} failed", route.filter());
                return Err(SubscribeError {
                    filter: route.filter.clone(),
                    source,
                });
            }
            debug!("subscribed to {}", route.filter());
        }

        Ok(Dispatcher::new(self.routes, log))
    }
}

impl<const MAX_HANDLERS: usize> Default for HandlerRegistry<'_, MAX_HANDLERS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h, const MAX_HANDLERS: usize> HandlerCollector<'h> for HandlerRegistry<'h, MAX_HANDLERS> {
    fn add(&mut self, filter: &str, handler: &'h dyn MessageHandler) -> Result<(), RegistryError> {
        self.register_handler(filter, handler)
    }
}
