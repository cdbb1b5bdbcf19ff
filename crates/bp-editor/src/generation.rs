//! Render status and progress forwarded to the external editor, plus the
//! "queue" request coming back from it.

use bp_core::{NodeId, RenderStatus};

/// Outbound status change produced by an execution event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Render(RenderStatus),
    Progress(u8),
}

#[derive(Debug, Default)]
pub struct GenerationTracker {
    status: Option<RenderStatus>,
    queue_pending: bool,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<RenderStatus> {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == Some(RenderStatus::Generating)
    }

    pub fn execution_started(&mut self) -> StatusChange {
        self.status = Some(RenderStatus::Generating);
        StatusChange::Render(RenderStatus::Generating)
    }

    /// `executing` event. A `None` node means the prompt finished.
    pub fn executing(&mut self, node: Option<NodeId>) -> Option<StatusChange> {
        match node {
            Some(_) => None,
            None => {
                self.status = Some(RenderStatus::Generated);
                Some(StatusChange::Render(RenderStatus::Generated))
            }
        }
    }

    pub fn execution_failed(&mut self) -> StatusChange {
        self.status = Some(RenderStatus::Error);
        StatusChange::Render(RenderStatus::Error)
    }

    /// Sampler progress as a whole percentage. Readings outside `0..=100`
    /// are dropped.
    pub fn progress(&self, value: f64, max: f64) -> Option<StatusChange> {
        let percent = (value / max * 100.0).floor();
        (0.0..=100.0)
            .contains(&percent)
            .then_some(StatusChange::Progress(percent as u8))
    }

    /// Inbound `queue` request. Runs right away when nothing is generating,
    /// otherwise waits for the current prompt to finish. Returns `true` when
    /// the host should queue a prompt now. Ignored without plugin nodes or
    /// while a request is already waiting.
    pub fn request_queue(&mut self, plugin_present: bool) -> bool {
        if !plugin_present {
            log::debug!("queue: no plugin nodes in graph; ignored");
            return false;
        }
        if self.queue_pending {
            return false;
        }
        if self.is_running() {
            log::debug!("queue: generation running; deferred");
            self.queue_pending = true;
            false
        } else {
            true
        }
    }

    /// Consume a deferred queue request once the current prompt is done.
    pub fn take_ready(&mut self) -> bool {
        if self.queue_pending && !self.is_running() {
            self.queue_pending = false;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lifecycle_statuses() {
        let mut tracker = GenerationTracker::new();
        assert_eq!(tracker.execution_started(), StatusChange::Render(RenderStatus::Generating));
        assert_eq!(tracker.executing(Some(NodeId(3))), None);
        assert_eq!(
            tracker.executing(None),
            Some(StatusChange::Render(RenderStatus::Generated))
        );
        assert_eq!(tracker.execution_failed(), StatusChange::Render(RenderStatus::Error));
    }

    #[test]
    fn progress_is_floored_percentage() {
        let tracker = GenerationTracker::new();
        assert_eq!(tracker.progress(1.0, 3.0), Some(StatusChange::Progress(33)));
        assert_eq!(tracker.progress(20.0, 20.0), Some(StatusChange::Progress(100)));
        assert_eq!(tracker.progress(30.0, 20.0), None);
        assert_eq!(tracker.progress(1.0, 0.0), None);
    }

    #[test]
    fn queue_waits_for_running_prompt() {
        let mut tracker = GenerationTracker::new();
        assert!(tracker.request_queue(true));

        tracker.execution_started();
        assert!(!tracker.request_queue(true));
        assert!(!tracker.request_queue(true));
        assert!(!tracker.take_ready());

        tracker.executing(None);
        assert!(tracker.take_ready());
        assert!(!tracker.take_ready());
    }

    #[test]
    fn queue_needs_plugin_nodes() {
        let mut tracker = GenerationTracker::new();
        assert!(!tracker.request_queue(false));
        tracker.execution_started();
        tracker.request_queue(false);
        tracker.executing(None);
        assert!(!tracker.take_ready());
    }
}
