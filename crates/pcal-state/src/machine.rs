//! # Transition-Table State Machine
//!
//! `StateMachine<S, C>` answers one question: given the current state and a
//! command, which state comes next?
//!
//! ## Lookup Order
//!
//! ```text
//! get_next_state(from, command):
//!   1. wildcard table has command  → that target (even if `from` also maps it)
//!   2. from's table has command    → that target
//!   3. otherwise                   → None
//! ```
//!
//! `None` is an ordinary outcome, not an error. The caller decides whether
//! an unmapped command is misuse.
//!
//! ## Validation
//!
//! [`StateMachine::new`] rejects tables where a state is listed twice, a
//! transition names a state outside the state set, or the same
//! `(source, command)` pair is mapped twice. After construction the machine
//! is immutable and can be shared freely.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

use thiserror::Error;

// ─── Errors ──────────────────────────────────────────────────────────

/// A transition table failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The state set was empty.
    #[error("state machine has no states")]
    NoStates,

    /// A state appears more than once in the state set.
    #[error("state {state} is declared more than once")]
    DuplicateState {
        /// The repeated state.
        state: String,
    },

    /// A transition references a state that is not in the state set.
    #[error("transition on {command} references undeclared state {state}")]
    UndeclaredState {
        /// The undeclared state.
        state: String,
        /// The command of the offending transition.
        command: String,
    },

    /// A source (or the wildcard) maps the same command twice.
    #[error("{from} maps command {command} more than once")]
    DuplicateTransition {
        /// The source state, or `*` for the wildcard.
        from: String,
        /// The command mapped twice.
        command: String,
    },
}

// ─── Table Entries ───────────────────────────────────────────────────

/// Source of a transition: one specific state, or every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FromState<S> {
    /// Matches any current state.
    Wildcard,
    /// Matches exactly this state.
    State(S),
}

impl<S: Display> Display for FromState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wildcard => f.write_str("*"),
            Self::State(s) => s.fmt(f),
        }
    }
}

/// One row of a transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S, C> {
    pub from: FromState<S>,
    pub command: C,
    pub to: S,
}

impl<S, C> Transition<S, C> {
    /// A transition out of one specific state.
    pub const fn on(from: S, command: C, to: S) -> Self {
        Self {
            from: FromState::State(from),
            command,
            to,
        }
    }

    /// A transition out of every state.
    pub const fn any(command: C, to: S) -> Self {
        Self {
            from: FromState::Wildcard,
            command,
            to,
        }
    }
}

// ─── State Machine ───────────────────────────────────────────────────

/// A validated, immutable transition table with wildcard precedence.
#[derive(Debug, Clone)]
pub struct StateMachine<S, C> {
    states: Vec<S>,
    transitions: Vec<Transition<S, C>>,
    wildcard: HashMap<C, S>,
    specific: HashMap<S, HashMap<C, S>>,
}

impl<S, C> StateMachine<S, C>
where
    S: Copy + Eq + Hash + Display,
    C: Copy + Eq + Hash + Display,
{
    /// Build a machine from a state set and its transitions.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] describing the first structural defect found.
    pub fn new(states: &[S], transitions: &[Transition<S, C>]) -> Result<Self, GraphError> {
        if states.is_empty() {
            return Err(GraphError::NoStates);
        }

        let mut declared = HashSet::with_capacity(states.len());
        for state in states {
            if !declared.insert(*state) {
                return Err(GraphError::DuplicateState {
                    state: state.to_string(),
                });
            }
        }

        let mut wildcard = HashMap::new();
        let mut specific: HashMap<S, HashMap<C, S>> = HashMap::new();

        for t in transitions {
            let undeclared = |state: &S| GraphError::UndeclaredState {
                state: state.to_string(),
                command: t.command.to_string(),
            };
            if !declared.contains(&t.to) {
                return Err(undeclared(&t.to));
            }
            let slot = match t.from {
                FromState::Wildcard => &mut wildcard,
                FromState::State(from) => {
                    if !declared.contains(&from) {
                        return Err(undeclared(&from));
                    }
                    specific.entry(from).or_default()
                }
            };
            if slot.insert(t.command, t.to).is_some() {
                return Err(GraphError::DuplicateTransition {
                    from: t.from.to_string(),
                    command: t.command.to_string(),
                });
            }
        }

        Ok(Self {
            states: states.to_vec(),
            transitions: transitions.to_vec(),
            wildcard,
            specific,
        })
    }

    /// The state that follows `from` on `command`, if any.
    ///
    /// A wildcard entry for `command` wins over an entry keyed on `from`.
    pub fn get_next_state(&self, from: S, command: C) -> Option<S> {
        if let Some(to) = self.wildcard.get(&command) {
            return Some(*to);
        }
        self.specific
            .get(&from)
            .and_then(|table| table.get(&command))
            .copied()
    }

    /// Whether `state` belongs to this machine's state set.
    pub fn contains_state(&self, state: S) -> bool {
        self.states.contains(&state)
    }

    /// The declared states, in declaration order.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// The declared transitions, in declaration order.
    pub fn transitions(&self) -> &[Transition<S, C>] {
        &self.transitions
    }

    /// Commands with a wildcard entry.
    pub fn wildcard_commands(&self) -> impl Iterator<Item = C> + '_ {
        self.wildcard.keys().copied()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
