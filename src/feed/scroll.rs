//! Scroll-proximity trigger for loading the next page.
//!
//! The trigger watches a sentinel (the last loaded product) through a
//! [`VisibilityObserver`] and asks for the next page when the sentinel comes
//! within the proximity margin of the viewport.

use crate::catalog::ProductId;
use tracing::debug;

/// Identifies the element being watched. In the feed this is the id of the
/// last loaded product.
pub type SentinelId = ProductId;

/// Handle returned by [`VisibilityObserver::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// How many rows ahead of the viewport edge count as "approaching".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProximityMargin(pub usize);

/// A change in whether a watched sentinel is near the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEvent {
    pub subscription: SubscriptionId,
    pub in_proximity: bool,
}

/// Visibility observation primitive the trigger is built on.
pub trait VisibilityObserver {
    /// Starts watching a sentinel. The observer reports the initial state
    /// and every later change as [`VisibilityEvent`]s.
    fn subscribe(&mut self, sentinel: SentinelId, margin: ProximityMargin) -> SubscriptionId;

    /// Stops watching.
    fn unsubscribe(&mut self, subscription: SubscriptionId);
}

#[derive(Debug)]
struct Observation {
    sentinel: SentinelId,
    subscription: SubscriptionId,
    in_proximity: bool,
}

/// Fires at most one load per transition of the sentinel into proximity.
pub struct ScrollTrigger<O: VisibilityObserver> {
    observer: O,
    margin: ProximityMargin,
    current: Option<Observation>,
}

impl<O: VisibilityObserver> ScrollTrigger<O> {
    pub fn new(observer: O, margin: ProximityMargin) -> Self {
        Self { observer, margin, current: None }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Returns the sentinel currently watched.
    pub fn sentinel(&self) -> Option<SentinelId> {
        self.current.as_ref().map(|o| o.sentinel)
    }

    /// Points the trigger at a new sentinel, or at none.
    ///
    /// The previous subscription is always disposed before a new one is made.
    /// Attaching the sentinel already watched keeps the existing subscription.
    pub fn attach(&mut self, sentinel: Option<SentinelId>) {
        if self.sentinel() == sentinel {
            return;
        }
        self.detach();

        if let Some(sentinel) = sentinel {
            let subscription = self.observer.subscribe(sentinel, self.margin);
            debug!("Watching sentinel {} ({:?})", sentinel, subscription);
            self.current = Some(Observation { sentinel, subscription, in_proximity: false });
        }
    }

    /// Disposes the current subscription, if any.
    pub fn detach(&mut self) {
        if let Some(previous) = self.current.take() {
            self.observer.unsubscribe(previous.subscription);
        }
    }

    /// Handles an observer event. Returns true when the caller should load
    /// the next page.
    ///
    /// Events for disposed subscriptions are ignored. Entering proximity
    /// while a fetch is running does not fire, and staying in proximity
    /// never fires twice.
    pub fn on_visibility(&mut self, event: VisibilityEvent, fetching: bool) -> bool {
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        if current.subscription != event.subscription {
            return false;
        }

        if !event.in_proximity {
            current.in_proximity = false;
            return false;
        }
        if current.in_proximity {
            return false;
        }
        current.in_proximity = true;

        if fetching {
            debug!("Sentinel {} in proximity while fetching, not triggering", current.sentinel);
            return false;
        }
        true
    }
}

impl<O: VisibilityObserver> Drop for ScrollTrigger<O> {
    fn drop(&mut self) {
        self.detach();
    }
}
