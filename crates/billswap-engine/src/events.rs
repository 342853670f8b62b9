//! Append-only event log.
//!
//! Every lifecycle transition lands here exactly once. The log is a pure
//! side-effect sink: the engine never reads it to make decisions, clients
//! read it for timelines, and the arbiter reads it as the evidence trail.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use billswap_types::{Actor, EventId, EventPayload, Result, SwapEvent, SwapId};

/// In-memory append-only event log with a per-swap index.
pub struct EventLog {
    events: Vec<SwapEvent>,
    by_swap: HashMap<SwapId, Vec<usize>>,
}

impl EventLog {
    /// Create a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            by_swap: HashMap::new(),
        }
    }

    /// Append one event, computing its payload hash.
    ///
    /// # Errors
    /// Returns `Serialization` if the payload cannot be serialized.
    pub fn append(
        &mut self,
        swap: SwapId,
        actor: Actor,
        payload: EventPayload,
        now: DateTime<Utc>,
    ) -> Result<EventId> {
        let event = SwapEvent::record(swap, actor, payload, now)?;
        let id = event.id;
        tracing::debug!(
            swap = %swap,
            actor = %actor,
            kind = event.payload.kind(),
            hash = %event.payload_hash_hex(),
            "Event appended"
        );
        self.by_swap.entry(swap).or_default().push(self.events.len());
        self.events.push(event);
        Ok(id)
    }

    /// Full timeline for one swap, in append order.
    #[must_use]
    pub fn timeline(&self, swap: SwapId) -> Vec<&SwapEvent> {
        self.by_swap
            .get(&swap)
            .map(|indices| indices.iter().map(|&i| &self.events[i]).collect())
            .unwrap_or_default()
    }

    /// All events, in append order.
    pub fn iter(&self) -> impl Iterator<Item = &SwapEvent> {
        self.events.iter()
    }

    /// Total events recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_timeline() {
        let mut log = EventLog::new();
        let swap = SwapId::new();
        let other = SwapId::new();
        let now = Utc::now();

        log.append(swap, Actor::System, EventPayload::OfferExpired, now)
            .unwrap();
        log.append(other, Actor::System, EventPayload::SwapCompleted, now)
            .unwrap();
        log.append(swap, Actor::System, EventPayload::SwapCompleted, now)
            .unwrap();

        assert_eq!(log.len(), 3);
        let timeline = log.timeline(swap);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].payload, EventPayload::OfferExpired);
        assert_eq!(timeline[1].payload, EventPayload::SwapCompleted);
    }

    #[test]
    fn events_carry_verified_hashes() {
        let mut log = EventLog::new();
        let swap = SwapId::new();
        log.append(swap, Actor::System, EventPayload::SwapCompleted, Utc::now())
            .unwrap();
        assert!(log.timeline(swap)[0].verify_hash());
    }

    #[test]
    fn unknown_swap_has_empty_timeline() {
        let log = EventLog::new();
        assert!(log.timeline(SwapId::new()).is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn event_ids_are_ordered() {
        let mut log = EventLog::new();
        let swap = SwapId::new();
        let now = Utc::now();
        let a = log
            .append(swap, Actor::System, EventPayload::OfferExpired, now)
            .unwrap();
        let b = log
            .append(swap, Actor::System, EventPayload::SwapCompleted, now)
            .unwrap();
        assert!(a < b);
    }
}
