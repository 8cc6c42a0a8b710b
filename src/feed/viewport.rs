//! Row-based visibility observer for a terminal viewport.

use super::scroll::{ProximityMargin, SentinelId, SubscriptionId, VisibilityEvent, VisibilityObserver};

/// A window of rows over the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Index of the first visible row
    pub top: usize,
    /// Number of visible rows
    pub rows: usize,
}

impl Viewport {
    pub fn new(rows: usize) -> Self {
        Self { top: 0, rows: rows.max(1) }
    }

    /// One past the last visible row.
    pub fn bottom(&self) -> usize {
        self.top + self.rows
    }

    /// Moves down one screen without passing the end of the feed.
    pub fn page_down(&mut self, len: usize) {
        let last_top = len.saturating_sub(self.rows);
        self.top = (self.top + self.rows).min(last_top.max(self.top));
    }

    /// Moves up one screen.
    pub fn page_up(&mut self) {
        self.top = self.top.saturating_sub(self.rows);
    }

    /// Returns true if `row` lies within `margin` rows of the viewport.
    pub fn is_near(&self, row: usize, margin: ProximityMargin) -> bool {
        row + margin.0 >= self.top && row < self.bottom() + margin.0
    }
}

#[derive(Debug)]
struct Watch {
    subscription: SubscriptionId,
    sentinel: SentinelId,
    margin: ProximityMargin,
    reported: Option<bool>,
}

/// Computes sentinel proximity from row positions each time the viewport or
/// the feed changes.
#[derive(Debug, Default)]
pub struct ViewportObserver {
    next_id: u64,
    watches: Vec<Watch>,
}

impl ViewportObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn active(&self) -> usize {
        self.watches.len()
    }

    /// Re-evaluates every subscription and returns the ones whose proximity
    /// changed, including the first report after subscribing.
    pub fn scan(
        &mut self,
        viewport: Viewport,
        position_of: impl Fn(SentinelId) -> Option<usize>,
    ) -> Vec<VisibilityEvent> {
        let mut events = Vec::new();
        for watch in &mut self.watches {
            let in_proximity =
                position_of(watch.sentinel).is_some_and(|row| viewport.is_near(row, watch.margin));
            if watch.reported != Some(in_proximity) {
                watch.reported = Some(in_proximity);
                events.push(VisibilityEvent { subscription: watch.subscription, in_proximity });
            }
        }
        events
    }
}

impl VisibilityObserver for ViewportObserver {
    fn subscribe(&mut self, sentinel: SentinelId, margin: ProximityMargin) -> SubscriptionId {
        self.next_id += 1;
        let subscription = SubscriptionId(self.next_id);
        self.watches.push(Watch { subscription, sentinel, margin, reported: None });
        subscription
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.watches.retain(|w| w.subscription != subscription);
    }
}
