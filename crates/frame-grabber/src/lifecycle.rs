//! One-shot grabber lifecycle shared between controller and worker.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    NotStarted,
    Running,
    Stopped,
}

impl Lifecycle {
    fn as_u8(self) -> u8 {
        match self {
            Lifecycle::NotStarted => 0,
            Lifecycle::Running => 1,
            Lifecycle::Stopped => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Lifecycle::NotStarted,
            1 => Lifecycle::Running,
            _ => Lifecycle::Stopped,
        }
    }
}

/// Atomic lifecycle cell. Transitions only move forward:
/// not-started -> running -> stopped, or not-started -> stopped.
#[derive(Debug)]
pub(crate) struct LifecycleFlag {
    state: AtomicU8,
}

impl LifecycleFlag {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(Lifecycle::NotStarted.as_u8()),
        }
    }

    pub(crate) fn get(&self) -> Lifecycle {
        Lifecycle::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.get() == Lifecycle::Running
    }

    /// Move not-started -> running. Returns the state observed before the call.
    pub(crate) fn begin(&self) -> Lifecycle {
        match self.state.compare_exchange(
            Lifecycle::NotStarted.as_u8(),
            Lifecycle::Running.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(prev) | Err(prev) => Lifecycle::from_u8(prev),
        }
    }

    /// Enter the terminal state. Returns the state observed before the call.
    pub(crate) fn halt(&self) -> Lifecycle {
        Lifecycle::from_u8(self.state.swap(Lifecycle::Stopped.as_u8(), Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_started() {
        let flag = LifecycleFlag::new();
        assert_eq!(flag.get(), Lifecycle::NotStarted);
        assert!(!flag.is_running());
    }

    #[test]
    fn begin_only_from_not_started() {
        let flag = LifecycleFlag::new();
        assert_eq!(flag.begin(), Lifecycle::NotStarted);
        assert!(flag.is_running());
        // second begin observes running and changes nothing
        assert_eq!(flag.begin(), Lifecycle::Running);
        assert!(flag.is_running());
    }

    #[test]
    fn stopped_is_terminal() {
        let flag = LifecycleFlag::new();
        flag.begin();
        assert_eq!(flag.halt(), Lifecycle::Running);
        assert_eq!(flag.begin(), Lifecycle::Stopped);
        assert_eq!(flag.get(), Lifecycle::Stopped);
        assert_eq!(flag.halt(), Lifecycle::Stopped);
    }

    #[test]
    fn halt_before_begin() {
        let flag = LifecycleFlag::new();
        assert_eq!(flag.halt(), Lifecycle::NotStarted);
        assert_eq!(flag.begin(), Lifecycle::Stopped);
    }
}
