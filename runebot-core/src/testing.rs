//! Test doubles for exercising the decision loop without a live game.

use std::sync::{Arc, Mutex};

use crate::events::{AgentEvent, EventSink};
use crate::selector::{KnowledgeHit, KnowledgeSource};

/// Event sink that records everything it sees. Clones share the same
/// buffer, so keep a handle before passing one into a session.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AgentEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far.
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().expect("sink lock poisoned").clone()
    }

    /// Number of events emitted so far.
    pub fn len(&self) -> usize {
        self.events.lock().expect("sink lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AgentEvent) {
        self.events
            .lock()
            .expect("sink lock poisoned")
            .push(event.clone());
    }
}

/// Knowledge source that returns the same canned hits for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledge {
    hits: Vec<KnowledgeHit>,
}

impl StaticKnowledge {
    pub fn new(hits: Vec<KnowledgeHit>) -> Self {
        Self { hits }
    }
}

impl KnowledgeSource for StaticKnowledge {
    fn query(&self, _text: &str) -> Vec<KnowledgeHit> {
        self.hits.clone()
    }
}
