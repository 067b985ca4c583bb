use crate::state::snapshot::AgentState;
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};

/// Snapshots retained per agent unless configured otherwise
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Fixed-capacity FIFO. Pushing into a full buffer evicts the oldest entry.
#[derive(Clone, Debug)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> BoundedHistory<T> {
    /// Create an empty buffer. A capacity of zero is bumped to one so the
    /// latest entry is always retrievable.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest entry first if full
    pub fn push(&mut self, entry: T) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        debug_assert!(self.entries.len() <= self.capacity);
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Up to `limit` most recent entries in chronological order.
    ///
    /// `limit == 0` returns the whole retained history.
    pub fn recent(&self, limit: usize) -> Vec<T> {
        let skip = if limit == 0 {
            0
        } else {
            self.entries.len().saturating_sub(limit)
        };
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Copy of every retained entry, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Per-agent bounded history of state snapshots.
///
/// Each agent's sequence lives behind its own DashMap shard lock, so a
/// reader never observes a sequence mid-append and concurrent appends for
/// different agents do not interleave.
pub struct StateHistoryStore {
    agents: DashMap<String, BoundedHistory<AgentState>>,
    capacity: usize,
}

impl StateHistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            agents: DashMap::new(),
            capacity,
        }
    }

    /// Append a snapshot, creating the agent's sequence if absent.
    ///
    /// Only the hub writes to the store.
    pub(crate) fn append(&self, agent_id: &str, state: AgentState) {
        let capacity = self.capacity;
        self.agents
            .entry(agent_id.to_string())
            .or_insert_with(|| BoundedHistory::new(capacity))
            .push(state);
    }

    /// Latest snapshot for an agent
    pub fn current(&self, agent_id: &str) -> Option<AgentState> {
        self.agents
            .get(agent_id)
            .and_then(|history| history.latest().cloned())
    }

    /// Up to `limit` most recent snapshots, oldest first.
    ///
    /// `limit <= 0` returns the full retained history. Unknown agents yield
    /// an empty list.
    pub fn recent(&self, agent_id: &str, limit: i64) -> Vec<AgentState> {
        let limit = usize::try_from(limit).unwrap_or(0);
        self.agents
            .get(agent_id)
            .map(|history| history.recent(limit))
            .unwrap_or_default()
    }

    /// Latest snapshot of every known agent
    pub fn all_current(&self) -> HashMap<String, AgentState> {
        self.agents
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .latest()
                    .map(|state| (entry.key().clone(), state.clone()))
            })
            .collect()
    }

    /// Number of agents with at least one snapshot
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

impl Default for StateHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
