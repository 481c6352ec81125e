//! In-process record of completed exchanges. Durable storage belongs to an
//! external collaborator; this is working memory for one session.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

#[derive(Debug, Clone)]
pub struct Exchange {
    pub goal: String,
    pub summary: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct Memory {
    entries: RwLock<Vec<Exchange>>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn save(&self, goal: &str, summary: &str) {
        self.entries.write().push(Exchange {
            goal: goal.to_string(),
            summary: summary.to_string(),
            recorded_at: Utc::now(),
        });
    }

    pub fn history(&self) -> Vec<Exchange> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
