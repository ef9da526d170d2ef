//! Checkpoint/restore and runtime metrics for the call state machine,
//! covering its state and turn-bookkeeping fields.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::state::CallState;

#[derive(Debug, Clone)]
pub struct CallStateCheckpoint {
    pub index: usize,
    pub state: CallState,
    pub turn_number: u32,
    pub used_fillers: HashSet<String>,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct FsmMetrics {
    pub turn_count: u32,
    pub state_entries: HashMap<&'static str, u32>,
    pub interruptions: u32,
    pub fillers_played: u32,
    pub error_count: u32,
    pub checkpoint_count: u32,
    pub restore_count: u32,
}

impl FsmMetrics {
    pub fn record_state_entry(&mut self, state: CallState) {
        *self.state_entries.entry(state.as_str()).or_insert(0) += 1;
    }
}
