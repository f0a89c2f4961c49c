use std::collections::VecDeque;

use crate::simulation::Frame;

use super::config::PlayerHandle;
use super::events::SchedulerEvent;

/// Remembers the local checksum of recent frames and compares checksums
/// reported for the same frames from elsewhere.
#[derive(Debug, Clone)]
pub struct DesyncDetector {
    window: usize,
    local: VecDeque<(Frame, u32)>,
}

impl DesyncDetector {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            local: VecDeque::with_capacity(window.max(1)),
        }
    }

    /// Replaces an earlier record for the same frame.
    pub fn record_local(&mut self, frame: Frame, checksum: u32) {
        self.local.retain(|(f, _)| *f != frame);
        while self.local.len() >= self.window {
            self.local.pop_front();
        }
        self.local.push_back((frame, checksum));
    }

    pub fn local_checksum(&self, frame: Frame) -> Option<u32> {
        self.local
            .iter()
            .find(|(f, _)| *f == frame)
            .map(|(_, checksum)| *checksum)
    }

    /// `None` when the checksums agree or the frame is no longer known.
    pub fn check_remote(
        &self,
        frame: Frame,
        remote_handle: PlayerHandle,
        remote_checksum: u32,
    ) -> Option<SchedulerEvent> {
        let local_checksum = self.local_checksum(frame)?;
        (local_checksum != remote_checksum).then_some(SchedulerEvent::DesyncDetected {
            frame,
            remote_handle,
            local_checksum,
            remote_checksum,
        })
    }
}
