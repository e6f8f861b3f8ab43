//! Pending request table with generation-based invalidation.
//!
//! Every room join starts a new generation. Room-scoped requests remember the
//! generation they were issued in; when a new generation starts they move to a
//! bounded set of superseded ids, so a late response can be told apart from a
//! response to a request this table never saw.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::protocol::CorrelationId;

/// Upper bound on unanswered `chat.send` requests kept for correlation
pub const MAX_PENDING_SENDS: usize = 64;
/// Upper bound on unanswered `system.ping` requests kept for correlation
pub const MAX_PENDING_PINGS: usize = 16;
/// Upper bound on remembered ids of superseded room requests
pub const MAX_SUPERSEDED: usize = 256;

/// What an outstanding request was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestIntent {
    Join,
    History,
    Send,
    /// Connection-scoped; survives room switches
    Ping,
}

impl RequestIntent {
    fn is_room_scoped(self) -> bool {
        !matches!(self, Self::Ping)
    }
}

/// How a response's correlation id relates to the requests issued so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Answers a request that is still current
    Current(RequestIntent),
    /// Answers a request of a room that has since been left
    Superseded,
    /// Not issued by this table, already answered, or evicted
    Unknown,
}

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    intent: RequestIntent,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct PendingCorrelations {
    generation: u64,
    entries: HashMap<CorrelationId, PendingRequest>,
    send_order: VecDeque<CorrelationId>,
    ping_order: VecDeque<CorrelationId>,
    superseded: HashSet<CorrelationId>,
    superseded_order: VecDeque<CorrelationId>,
}

impl PendingCorrelations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of requests still waiting for a response
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start a new generation; every room-scoped request becomes superseded
    pub fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        let superseded: Vec<CorrelationId> = self
            .entries
            .iter()
            .filter(|(_, pending)| pending.intent.is_room_scoped())
            .map(|(id, _)| id.clone())
            .collect();
        for id in superseded {
            self.entries.remove(&id);
            self.remember_superseded(id);
        }
        self.send_order.clear();
        self.generation
    }

    /// Track a request issued in the current generation
    pub fn register(&mut self, id: CorrelationId, intent: RequestIntent) {
        let bounded = match intent {
            RequestIntent::Send => Some((&mut self.send_order, MAX_PENDING_SENDS)),
            RequestIntent::Ping => Some((&mut self.ping_order, MAX_PENDING_PINGS)),
            RequestIntent::Join | RequestIntent::History => None,
        };
        if let Some((order, limit)) = bounded {
            order.push_back(id.clone());
            while order.len() > limit {
                if let Some(oldest) = order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
        self.entries.insert(
            id,
            PendingRequest {
                intent,
                generation: self.generation,
            },
        );
    }

    /// Classify a response's correlation id, forgetting a matched request
    pub fn resolve(&mut self, id: &CorrelationId) -> Resolution {
        if self.superseded.contains(id) {
            return Resolution::Superseded;
        }
        let Some(pending) = self.entries.remove(id) else {
            return Resolution::Unknown;
        };
        self.forget_order(id, pending.intent);
        if pending.intent.is_room_scoped() && pending.generation != self.generation {
            return Resolution::Superseded;
        }
        Resolution::Current(pending.intent)
    }

    /// Forget a request that never made it onto the wire
    pub fn cancel(&mut self, id: &CorrelationId) {
        if let Some(pending) = self.entries.remove(id) {
            self.forget_order(id, pending.intent);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.send_order.clear();
        self.ping_order.clear();
        self.superseded.clear();
        self.superseded_order.clear();
    }

    fn forget_order(&mut self, id: &CorrelationId, intent: RequestIntent) {
        match intent {
            RequestIntent::Send => self.send_order.retain(|queued| queued != id),
            RequestIntent::Ping => self.ping_order.retain(|queued| queued != id),
            RequestIntent::Join | RequestIntent::History => {}
        }
    }

    fn remember_superseded(&mut self, id: CorrelationId) {
        if self.superseded.insert(id.clone()) {
            self.superseded_order.push_back(id);
        }
        while self.superseded_order.len() > MAX_SUPERSEDED {
            if let Some(oldest) = self.superseded_order.pop_front() {
                self.superseded.remove(&oldest);
            }
        }
    }
}
