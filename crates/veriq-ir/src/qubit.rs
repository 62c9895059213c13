//! Qubit and classical bit types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a qubit wire within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// Get the index as a `usize` for table lookups.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

impl From<usize> for QubitId {
    fn from(id: usize) -> Self {
        QubitId(u32::try_from(id).expect("QubitId overflow: exceeds u32::MAX"))
    }
}

/// Index of a classical bit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl ClbitId {
    /// Get the index as a `usize` for table lookups.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

impl From<usize> for ClbitId {
    fn from(id: usize) -> Self {
        ClbitId(u32::try_from(id).expect("ClbitId overflow: exceeds u32::MAX"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", QubitId(3)), "q3");
        assert_eq!(format!("{}", ClbitId(0)), "c0");
    }

    #[test]
    fn test_ordering() {
        assert!(QubitId(1) < QubitId(2));
        assert_eq!(QubitId::from(5usize), QubitId(5));
    }
}
