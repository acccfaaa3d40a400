use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::{platform::ClassifiedUrl, storage::MemoryStore};

pub const TICKET_PREFIX: &str = "clip:";

static TICKET_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^clip:[0-9a-f]{32}$").expect("valid ticket id regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    Placeholder,
    Resolving,
    Delivered,
    Failed,
}

/// One placeholder → resolve → replace lifecycle. The id doubles as the inline
/// result id, so the selection event carries it back.
#[derive(Debug, Clone)]
pub struct DeliveryTicket {
    pub id: String,
    pub source: ClassifiedUrl,
    pub state: TicketState,
    pub created_at: DateTime<Utc>,
}

impl DeliveryTicket {
    pub fn new(source: ClassifiedUrl) -> Self {
        Self {
            id: format!("{}{}", TICKET_PREFIX, Uuid::new_v4().simple()),
            source,
            state: TicketState::Placeholder,
            created_at: Utc::now(),
        }
    }
}

/// Returns the ticket id when `result_id` has the correlation format.
pub fn parse_ticket_id(result_id: &str) -> Option<&str> {
    TICKET_ID_REGEX.is_match(result_id).then_some(result_id)
}

pub trait TicketStore: Send + Sync {
    fn insert(&self, ticket: DeliveryTicket);

    fn get(&self, id: &str) -> Option<DeliveryTicket>;

    /// Moves the ticket to `to` only if it is currently in `from`.
    fn transition(&self, id: &str, from: TicketState, to: TicketState) -> bool;

    fn evict(&self, id: &str) -> Option<DeliveryTicket>;

    /// Drops tickets created before `cutoff`. Tickets still resolving are kept
    /// until `resolving_cutoff`, which should lie further in the past.
    fn evict_older_than(&self, cutoff: DateTime<Utc>, resolving_cutoff: DateTime<Utc>) -> usize;
}

#[derive(Clone)]
pub struct MemoryTicketStore {
    store: MemoryStore<DeliveryTicket>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(256),
        }
    }
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketStore for MemoryTicketStore {
    fn insert(&self, ticket: DeliveryTicket) {
        let id = ticket.id.clone();
        self.store.set(&id, ticket);
    }

    fn get(&self, id: &str) -> Option<DeliveryTicket> {
        self.store.get(id)
    }

    fn transition(&self, id: &str, from: TicketState, to: TicketState) -> bool {
        self.store.update(id, |ticket| {
            if ticket.state != from {
                return false;
            }
            ticket.state = to;
            true
        })
    }

    fn evict(&self, id: &str) -> Option<DeliveryTicket> {
        self.store.del(id)
    }

    fn evict_older_than(&self, cutoff: DateTime<Utc>, resolving_cutoff: DateTime<Utc>) -> usize {
        self.store.retain(|ticket| match ticket.state {
            TicketState::Resolving => ticket.created_at >= resolving_cutoff,
            _ => ticket.created_at >= cutoff,
        })
    }
}
