//! Per-run budgets and the mutable state they are checked against.

use std::time::Duration;

use sprintloop_config::BudgetConfig;
use sprintloop_core::{ConversationMessage, IdempotencyCache};
use tokio::time::Instant;

use crate::dedupe::CallDeduplicator;

/// Immutable resource ceilings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budgets {
    pub deadline: Duration,
    pub max_steps: u32,
    pub max_total_tool_calls: u32,
    pub max_write_calls: u32,
    /// How many times one call fingerprint may be seen before the run is
    /// treated as looping.
    pub max_repeated_calls: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self::from(&BudgetConfig::default())
    }
}

impl From<&BudgetConfig> for Budgets {
    fn from(config: &BudgetConfig) -> Self {
        Self {
            deadline: Duration::from_secs(config.deadline_secs),
            max_steps: config.max_steps,
            max_total_tool_calls: config.max_total_tool_calls,
            max_write_calls: config.max_write_calls,
            max_repeated_calls: config.max_repeated_calls,
        }
    }
}

/// Why a run stopped before the model gave a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    Deadline,
    ToolCalls,
    Steps,
}

impl Exhausted {
    pub fn warning(self) -> &'static str {
        match self {
            Exhausted::Deadline => "Deadline exceeded",
            Exhausted::ToolCalls => "Max tool calls exceeded",
            Exhausted::Steps => "Max steps reached",
        }
    }
}

/// Mutable counters, history and cache of one run. Discarded once the
/// response is assembled.
#[derive(Debug)]
pub struct RunState {
    pub started: Instant,
    pub step: u32,
    pub total_calls: u32,
    pub write_calls: u32,
    pub dedupe: CallDeduplicator,
    pub history: Vec<ConversationMessage>,
    pub cache: IdempotencyCache,
    pub warnings: Vec<String>,
}

impl RunState {
    pub fn new(prompt: impl Into<String>, budgets: &Budgets) -> Self {
        Self {
            started: Instant::now(),
            step: 0,
            total_calls: 0,
            write_calls: 0,
            dedupe: CallDeduplicator::new(budgets.max_repeated_calls),
            history: vec![ConversationMessage::user(prompt)],
            cache: IdempotencyCache::new(),
            warnings: Vec::new(),
        }
    }

    /// Guard evaluated on entry to every turn, in order: deadline, total
    /// calls, steps.
    pub fn check_turn(&self, budgets: &Budgets) -> Option<Exhausted> {
        if self.started.elapsed() > budgets.deadline {
            Some(Exhausted::Deadline)
        } else if self.total_calls >= budgets.max_total_tool_calls {
            Some(Exhausted::ToolCalls)
        } else if self.step >= budgets.max_steps {
            Some(Exhausted::Steps)
        } else {
            None
        }
    }

    /// Count a write call. Returns `false` once the write ceiling is exceeded.
    pub fn record_write(&mut self, budgets: &Budgets) -> bool {
        self.write_calls += 1;
        self.write_calls <= budgets.max_write_calls
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let budgets = Budgets::default();
        assert_eq!(budgets.deadline, Duration::from_secs(30));
        assert_eq!(budgets.max_steps, 10);
        assert_eq!(budgets.max_total_tool_calls, 25);
        assert_eq!(budgets.max_write_calls, 15);
        assert_eq!(budgets.max_repeated_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_checked_first() {
        let budgets = Budgets {
            max_total_tool_calls: 0,
            ..Budgets::default()
        };
        let state = RunState::new("hi", &budgets);
        assert_eq!(state.check_turn(&budgets), Some(Exhausted::ToolCalls));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(state.check_turn(&budgets), Some(Exhausted::Deadline));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_strictly_greater() {
        let budgets = Budgets::default();
        let state = RunState::new("hi", &budgets);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(state.check_turn(&budgets), None);
    }

    #[test]
    fn steps_guard() {
        let budgets = Budgets {
            max_steps: 1,
            ..Budgets::default()
        };
        let mut state = RunState::new("hi", &budgets);
        assert_eq!(state.check_turn(&budgets), None);
        state.step = 1;
        assert_eq!(state.check_turn(&budgets), Some(Exhausted::Steps));
    }

    #[test]
    fn write_ceiling() {
        let budgets = Budgets {
            max_write_calls: 1,
            ..Budgets::default()
        };
        let mut state = RunState::new("hi", &budgets);
        assert!(state.record_write(&budgets));
        assert!(!state.record_write(&budgets));
        assert_eq!(state.write_calls, 2);
    }

    #[test]
    fn history_starts_with_prompt() {
        let state = RunState::new("Create stories", &Budgets::default());
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].text(), Some("Create stories"));
    }
}
