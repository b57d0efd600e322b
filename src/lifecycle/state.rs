use crate::client::OutboundTarget;
use std::net::SocketAddr;

/// Whether a listener run is active
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Stopped,
    Running {
        local_addr: SocketAddr,
        target: OutboundTarget,
    },
}

impl LifecycleState {
    pub fn is_running(&self) -> bool {
        matches!(self, LifecycleState::Running { .. })
    }

    /// Stopped -> Running, only after the listener has bound
    pub(super) fn bound(&mut self, local_addr: SocketAddr, target: OutboundTarget) {
        debug_assert!(!self.is_running(), "bound while already running");
        *self = LifecycleState::Running { local_addr, target };
    }

    /// Running -> Stopped; returns the address that was released
    pub(super) fn released(&mut self) -> Option<SocketAddr> {
        match std::mem::take(self) {
            LifecycleState::Running { local_addr, .. } => Some(local_addr),
            LifecycleState::Stopped => None,
        }
    }
}
