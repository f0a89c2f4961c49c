use serde::{Deserialize, Serialize};

use lockstep::{PacingConfig, SessionConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub session: SessionConfig,
    pub pacing: PacingConfig,
    /// Frames the sync-test scheduler rolls back every step.
    pub check_distance: u32,
    /// Stop after this many frames; run until quit when unset.
    pub max_frames: Option<u32>,
    /// Frames each scripted direction is held; 0 idles.
    pub hold_frames: u32,
    /// How long a graceful leave may take on shutdown.
    pub shutdown_timeout_ms: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            pacing: PacingConfig::default(),
            check_distance: 2,
            max_frames: None,
            hold_frames: 30,
            shutdown_timeout_ms: 1000,
        }
    }
}
