//! Lifecycle actions and combinable action sets.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// A single lifecycle action in the CRUD pattern.
///
/// The numeric codes (1, 2, 4) are the persisted wire form; audit
/// records store them in their `action` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    /// Persisted numeric code for this action.
    pub fn code(self) -> u8 {
        match self {
            Action::Create => 1,
            Action::Update => 2,
            Action::Delete => 4,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

// ── Action sets ─────────────────────────────────────────────────────

/// A set of [`Action`]s a rule subscribes to.
///
/// Combinable with `|`: `Action::Create | Action::Update`. The set is
/// exhaustive over the three lifecycle actions, so [`ActionSet::ALL`]
/// covers every dispatch phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActionSet {
    bits: u8,
}

impl ActionSet {
    /// The empty set matches no phase.
    pub const EMPTY: ActionSet = ActionSet { bits: 0 };

    /// Every action.
    pub const ALL: ActionSet = ActionSet { bits: 0b111 };

    pub fn contains(self, action: Action) -> bool {
        self.bits & action.code() != 0
    }

    pub fn insert(&mut self, action: Action) {
        self.bits |= action.code();
    }

    pub fn union(self, other: ActionSet) -> ActionSet {
        ActionSet {
            bits: self.bits | other.bits,
        }
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Member actions in Create, Update, Delete order.
    pub fn iter(self) -> impl Iterator<Item = Action> {
        [Action::Create, Action::Update, Action::Delete]
            .into_iter()
            .filter(move |a| self.contains(*a))
    }
}

impl From<Action> for ActionSet {
    fn from(action: Action) -> Self {
        ActionSet {
            bits: action.code(),
        }
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::EMPTY;
        for action in iter {
            set.insert(action);
        }
        set
    }
}

impl BitOr for Action {
    type Output = ActionSet;

    fn bitor(self, rhs: Action) -> ActionSet {
        ActionSet::from(self).union(rhs.into())
    }
}

impl BitOr<Action> for ActionSet {
    type Output = ActionSet;

    fn bitor(self, rhs: Action) -> ActionSet {
        self.union(rhs.into())
    }
}

impl BitOr for ActionSet {
    type Output = ActionSet;

    fn bitor(self, rhs: ActionSet) -> ActionSet {
        self.union(rhs)
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for action in self.iter() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{action}")?;
            first = false;
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
