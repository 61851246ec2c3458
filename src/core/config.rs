//! One-shot segmenter configuration.

use std::sync::Arc;

use super::automaton::{FsmKind, VocabAutomata};

/// Read-only configuration installing the compiled vocabulary automata.
///
/// A `DictConfig` is queried exactly once, when a
/// [`Segmenter`](super::Segmenter) is constructed from it; reconfiguring a
/// live segmenter is not supported. The automata sit behind an [`Arc`], so
/// any number of segmenters (and threads) can share one compiled vocabulary.
#[derive(Clone)]
pub struct DictConfig {
    fsm_kind: FsmKind,
    automata: Arc<VocabAutomata>,
}

impl DictConfig {
    pub fn new(fsm_kind: FsmKind, automata: VocabAutomata) -> Self {
        Self {
            fsm_kind,
            automata: Arc::new(automata),
        }
    }

    /// Configuration declaring a Mealy-DFA vocabulary, the only kind the
    /// segmenter accepts.
    pub fn mealy(automata: VocabAutomata) -> Self {
        Self::new(FsmKind::MealyDfa, automata)
    }

    /// The declared automaton kind.
    pub fn fsm_kind(&self) -> FsmKind {
        self.fsm_kind
    }

    /// The shared automata.
    pub fn automata(&self) -> &Arc<VocabAutomata> {
        &self.automata
    }
}
