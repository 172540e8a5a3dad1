//! Execution and propagation direction.

use std::fmt;

/// Direction of control transfer or of dataflow propagation.
///
/// For control instructions, `Forward` marks an exit point (`-> L`) and
/// `Backward` an entry point (`L <-`). For `call`/`uncall`, it selects
/// whether the callee runs forward or backward.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Pick one of two values depending on the direction.
    #[inline]
    pub fn choose<T>(self, forward: T, backward: T) -> T {
        match self {
            Direction::Forward => forward,
            Direction::Backward => backward,
        }
    }

    #[must_use]
    pub fn reversed(self) -> Direction {
        self.choose(Direction::Backward, Direction::Forward)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.choose("forward", "backward"))
    }
}

#[cfg(test)]
mod tests {
    use super::Direction;

    #[test]
    fn choose_and_reverse() {
        assert_eq!(Direction::Forward.choose(1, 2), 1);
        assert_eq!(Direction::Backward.choose(1, 2), 2);
        assert_eq!(Direction::Forward.reversed(), Direction::Backward);
        assert_eq!(Direction::Backward.to_string(), "backward");
    }
}
