//! Completion correlation over the backend event stream.
//!
//! ComfyUI events do not name the relay's jobs, so the listener keeps a
//! small amount of state to decide when a submitted prompt has finished:
//!
//! * the last observed `queue_remaining` counter and the last reported
//!   prompt id, which together drive the inferred strategy (a strict
//!   decrease in the counter while a prompt id is known means that
//!   prompt finished; the id is consumed so one run completes once);
//! * per-prompt node outputs accumulated from `executed` messages, which
//!   feed the direct strategy so the completion handler can skip the
//!   history fetch.
//!
//! The state is owned by the listener task and survives reconnects:
//! work in flight before a disconnect may still complete and be
//! reported afterwards.
//!
//! The inferred strategy is only sound while the backend processes one
//! prompt at a time; with several prompts in flight a decreasing counter
//! cannot tell which one finished. The `execution_success` path does
//! not share that limitation and is preferred whenever the backend
//! emits it (duplicate triggers are absorbed by the store's idempotent
//! completion).

use std::collections::HashMap;

/// Correlation state owned by the event listener.
#[derive(Debug, Default)]
pub struct CorrelationState {
    last_queue_remaining: Option<i64>,
    last_prompt_id: Option<String>,
    pending_outputs: HashMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl CorrelationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the prompt id the backend reports as current.
    pub fn observe_prompt(&mut self, prompt_id: &str) {
        self.last_prompt_id = Some(prompt_id.to_string());
    }

    /// The most recently reported prompt id, if any.
    pub fn last_prompt_id(&self) -> Option<&str> {
        self.last_prompt_id.as_deref()
    }

    /// Record a new `queue_remaining` observation.
    ///
    /// Returns the prompt id to complete when the counter strictly
    /// decreased and a prompt id is known. The prompt id is consumed on
    /// fire so a later decrease cannot re-complete the same run; the
    /// stored counter is updated unconditionally on every observation.
    pub fn observe_queue(&mut self, remaining: i64) -> Option<String> {
        let previous = self.last_queue_remaining.replace(remaining);
        match previous {
            Some(prev) if remaining < prev => self.last_prompt_id.take(),
            _ => None,
        }
    }

    /// Accumulate a node output for a prompt (from `executed` messages).
    pub fn record_output(&mut self, prompt_id: &str, node: &str, output: serde_json::Value) {
        self.pending_outputs
            .entry(prompt_id.to_string())
            .or_default()
            .insert(node.to_string(), output);
    }

    /// Take the accumulated outputs for a prompt as a manifest, if any
    /// were recorded. Clears the entry.
    pub fn take_outputs(&mut self, prompt_id: &str) -> Option<serde_json::Value> {
        self.pending_outputs
            .remove(prompt_id)
            .filter(|outputs| !outputs.is_empty())
            .map(serde_json::Value::Object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completion_fires_once_on_strict_decrease() {
        let mut state = CorrelationState::new();
        state.observe_prompt("prompt-1");

        let mut fired = Vec::new();
        for remaining in [3, 3, 2, 2, 1] {
            if let Some(prompt_id) = state.observe_queue(remaining) {
                fired.push((remaining, prompt_id));
            }
        }

        // Fires at 3 -> 2 only: the prompt id is consumed on fire, so
        // the 2 -> 1 decrease has no run to attribute.
        assert_eq!(fired, vec![(2, "prompt-1".to_string())]);
    }

    #[test]
    fn first_observation_never_fires() {
        let mut state = CorrelationState::new();
        state.observe_prompt("p");

        assert_eq!(state.observe_queue(0), None);
    }

    #[test]
    fn decrease_without_known_prompt_does_not_fire() {
        let mut state = CorrelationState::new();

        assert_eq!(state.observe_queue(3), None);
        assert_eq!(state.observe_queue(2), None);

        // The counter was still tracked: once a prompt id appears, the
        // next decrease fires.
        state.observe_prompt("late");
        assert_eq!(state.observe_queue(1).as_deref(), Some("late"));
    }

    #[test]
    fn increase_does_not_fire() {
        let mut state = CorrelationState::new();
        state.observe_prompt("p");

        assert_eq!(state.observe_queue(1), None);
        assert_eq!(state.observe_queue(4), None);
        // Counter updated to 4, so dropping back to 3 is a decrease.
        assert_eq!(state.observe_queue(3).as_deref(), Some("p"));
    }

    #[test]
    fn prompt_id_updates_unconditionally() {
        let mut state = CorrelationState::new();
        state.observe_prompt("a");
        state.observe_prompt("b");

        assert_eq!(state.last_prompt_id(), Some("b"));
    }

    #[test]
    fn outputs_accumulate_per_prompt_and_take_clears() {
        let mut state = CorrelationState::new();
        state.record_output("p1", "9", json!({"images": [{"filename": "a.png"}]}));
        state.record_output("p1", "12", json!({"images": [{"filename": "b.png"}]}));
        state.record_output("p2", "9", json!({"images": [{"filename": "c.png"}]}));

        let manifest = state.take_outputs("p1").unwrap();
        assert_eq!(manifest["9"]["images"][0]["filename"], "a.png");
        assert_eq!(manifest["12"]["images"][0]["filename"], "b.png");

        // Taken once; p2 is untouched.
        assert!(state.take_outputs("p1").is_none());
        assert!(state.take_outputs("p2").is_some());
    }

    #[test]
    fn take_outputs_without_records_is_none() {
        let mut state = CorrelationState::new();
        assert!(state.take_outputs("unseen").is_none());
    }
}
