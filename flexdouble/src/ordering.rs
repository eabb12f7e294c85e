// vim: tw=80
//! Call ordering for a single double.

use std::collections::HashMap;

/// Allocates order slots and tracks how far a double's ordered calls have
/// progressed.
///
/// Each ordered expectation owns a slot number; expectations in a named group
/// share one.  A call in slot `n` is legal only while no call from a later
/// slot has happened, so calls sharing a slot may interleave freely.
#[derive(Debug, Default)]
pub struct Ordering {
    allocated: usize,
    current: usize,
    groups: HashMap<String, usize>,
}

impl Ordering {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next order slot.
    pub fn allocate(&mut self) -> usize {
        self.allocated += 1;
        self.allocated
    }

    /// The slot shared by the members of `group`, allocating it on first use.
    pub fn group(&mut self, group: &str) -> usize {
        if let Some(&n) = self.groups.get(group) {
            return n;
        }
        let n = self.allocate();
        self.groups.insert(group.to_string(), n);
        n
    }

    /// The highest slot reached so far
    pub fn current(&self) -> usize {
        self.current
    }

    /// Advance to `order`, unless a later slot has already been reached.  On
    /// failure, returns the current slot.
    pub fn advance(&mut self, order: usize) -> Result<(), usize> {
        if order < self.current {
            return Err(self.current);
        }
        self.current = order;
        Ok(())
    }
}

#[cfg(test)]
mod t {
    use super::*;

    #[test]
    fn groups_share_a_slot() {
        let mut o = Ordering::new();
        let a = o.allocate();
        let b = o.group("g");
        let c = o.group("g");
        let d = o.allocate();
        assert_eq!((1, 2, 2, 3), (a, b, c, d));
    }

    #[test]
    fn advance_is_monotonic() {
        let mut o = Ordering::new();
        assert_eq!(Ok(()), o.advance(2));
        assert_eq!(Ok(()), o.advance(2));
        assert_eq!(Err(2), o.advance(1));
        assert_eq!(2, o.current());
    }
}
