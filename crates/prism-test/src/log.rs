//! Shared record of backend calls.

use std::sync::Arc;

use parking_lot::Mutex;

/// Kinds of object the bootstrap creates and destroys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Instance,
    DebugMessenger,
    Surface,
    Device,
    Swapchain,
    ImageView,
    RenderPass,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    Framebuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Create(ResourceKind, u64),
    Destroy(ResourceKind, u64),
    WaitIdle,
}

/// Cloneable handle to the call log.
///
/// The log outlives the backend, so teardown done in `Drop` can still be
/// inspected after the context is gone.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Created objects in creation order.
    pub fn created(&self) -> Vec<(ResourceKind, u64)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match *call {
                Call::Create(kind, handle) => Some((kind, handle)),
                _ => None,
            })
            .collect()
    }

    /// Destroyed objects in destruction order.
    pub fn destroyed(&self) -> Vec<(ResourceKind, u64)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match *call {
                Call::Destroy(kind, handle) => Some((kind, handle)),
                _ => None,
            })
            .collect()
    }

    /// Handles of every created object of `kind`, in creation order.
    pub fn created_of(&self, kind: ResourceKind) -> Vec<u64> {
        self.created()
            .into_iter()
            .filter(|&(k, _)| k == kind)
            .map(|(_, handle)| handle)
            .collect()
    }

    /// Objects created but not yet destroyed, in creation order.
    pub fn live(&self) -> Vec<(ResourceKind, u64)> {
        let destroyed = self.destroyed();
        self.created()
            .into_iter()
            .filter(|entry| !destroyed.contains(entry))
            .collect()
    }

    /// Objects destroyed more than once.
    pub fn double_destroys(&self) -> Vec<(ResourceKind, u64)> {
        let destroyed = self.destroyed();
        let mut doubles = Vec::new();
        for (i, entry) in destroyed.iter().enumerate() {
            if destroyed[..i].contains(entry) && !doubles.contains(entry) {
                doubles.push(*entry);
            }
        }
        doubles
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_tracks_unmatched_creations() {
        let log = CallLog::new();
        log.push(Call::Create(ResourceKind::Instance, 1));
        log.push(Call::Create(ResourceKind::Surface, 2));
        log.push(Call::Destroy(ResourceKind::Surface, 2));

        assert_eq!(log.live(), vec![(ResourceKind::Instance, 1)]);
        assert_eq!(log.created_of(ResourceKind::Surface), vec![2]);
        assert!(log.double_destroys().is_empty());
    }

    #[test]
    fn clones_share_calls() {
        let log = CallLog::new();
        let other = log.clone();
        other.push(Call::WaitIdle);
        assert_eq!(log.calls(), vec![Call::WaitIdle]);

        log.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn repeated_destroys_are_reported() {
        let log = CallLog::new();
        log.push(Call::Create(ResourceKind::Pipeline, 5));
        log.push(Call::Destroy(ResourceKind::Pipeline, 5));
        log.push(Call::Destroy(ResourceKind::Pipeline, 5));
        assert_eq!(log.double_destroys(), vec![(ResourceKind::Pipeline, 5)]);
    }
}
