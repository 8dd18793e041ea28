// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Constraint tags carried by protected regions.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constraint {
    /// No suspension point may appear anywhere inside.
    Unsafe,
    /// Suspending here holds a lock across the suspension.
    MutexScope,
}

impl Constraint {
    const ALL: [Constraint; 2] = [Constraint::Unsafe, Constraint::MutexScope];

    fn bit(self) -> u8 {
        match self {
            Constraint::Unsafe => 1,
            Constraint::MutexScope => 2,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Unsafe => write!(f, "unsafe"),
            Constraint::MutexScope => write!(f, "mutex-scope"),
        }
    }
}

/// Small set of constraint tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConstraintSet(u8);

impl ConstraintSet {
    pub const EMPTY: ConstraintSet = ConstraintSet(0);

    pub fn of(tag: Constraint) -> Self {
        ConstraintSet(tag.bit())
    }

    pub fn contains(self, tag: Constraint) -> bool {
        self.0 & tag.bit() != 0
    }

    pub fn insert(&mut self, tag: Constraint) {
        self.0 |= tag.bit();
    }

    pub fn union(self, other: ConstraintSet) -> ConstraintSet {
        ConstraintSet(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Constraint> {
        Constraint::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        let mut set = ConstraintSet::EMPTY;
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}
