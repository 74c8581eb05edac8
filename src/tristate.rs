use std::fmt::{self, Display};
use std::ops::{BitAnd, BitOr, Not};

/// Result of evaluating a selector in boolean context.
///
/// Absent properties and type mismatches produce `Unknown`, which then
/// propagates through the connectives following SQL92 rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriState {
    True,
    False,
    Unknown,
}

impl TriState {
    pub fn and(self, other: TriState) -> TriState {
        use TriState::*;
        match (self, other) {
            (False, _) | (_, False) => False,
            (True, True) => True,
            _ => Unknown,
        }
    }

    pub fn or(self, other: TriState) -> TriState {
        use TriState::*;
        match (self, other) {
            (True, _) | (_, True) => True,
            (False, False) => False,
            _ => Unknown,
        }
    }

    pub fn negate(self) -> TriState {
        match self {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }

    /// Only a definite `True` counts as a match.
    pub fn is_true(self) -> bool {
        self == TriState::True
    }

    pub fn to_bool(self) -> Option<bool> {
        match self {
            TriState::True => Some(true),
            TriState::False => Some(false),
            TriState::Unknown => None,
        }
    }
}

impl From<bool> for TriState {
    fn from(b: bool) -> Self {
        if b {
            TriState::True
        } else {
            TriState::False
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(b: Option<bool>) -> Self {
        b.map(TriState::from).unwrap_or(TriState::Unknown)
    }
}

impl Not for TriState {
    type Output = TriState;

    fn not(self) -> TriState {
        self.negate()
    }
}

impl BitAnd for TriState {
    type Output = TriState;

    fn bitand(self, rhs: TriState) -> TriState {
        self.and(rhs)
    }
}

impl BitOr for TriState {
    type Output = TriState;

    fn bitor(self, rhs: TriState) -> TriState {
        self.or(rhs)
    }
}

impl Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriState::True => write!(f, "true"),
            TriState::False => write!(f, "false"),
            TriState::Unknown => write!(f, "unknown"),
        }
    }
}
