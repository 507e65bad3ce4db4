//! One-shot disconnect state: Running -> ShuttingDown -> Closed

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DisconnectState {
    Running = 0,
    ShuttingDown = 1,
    Closed = 2,
}

impl From<u8> for DisconnectState {
    fn from(value: u8) -> Self {
        match value {
            0 => DisconnectState::Running,
            1 => DisconnectState::ShuttingDown,
            _ => DisconnectState::Closed,
        }
    }
}

/// Lets exactly one caller win the right to run teardown.
#[derive(Debug)]
pub struct DisconnectGuard {
    state: AtomicU8,
}

impl DisconnectGuard {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(DisconnectState::Running as u8),
        }
    }

    /// Running -> ShuttingDown. True only for the single winning caller.
    pub fn begin(&self) -> bool {
        self.state
            .compare_exchange(
                DisconnectState::Running as u8,
                DisconnectState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// ShuttingDown -> Closed
    pub fn finish(&self) {
        self.state
            .store(DisconnectState::Closed as u8, Ordering::Release);
    }

    pub fn state(&self) -> DisconnectState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn is_running(&self) -> bool {
        self.state() == DisconnectState::Running
    }
}

impl Default for DisconnectGuard {
    fn default() -> Self {
        Self::new()
    }
}
