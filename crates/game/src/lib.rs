pub mod fixed;
pub mod net;
pub mod pacing;
pub mod rollback;
pub mod session;
pub mod simulation;

pub use fixed::Fix16;
pub use net::{
    Channel, DEFAULT_PORT, NetworkStats, PacketLossSimulation, PeerId, Transport,
    TransportConfig, TransportError, TransportEvent, UdpTransport,
};
pub use pacing::{Pacer, PacingConfig};
pub use rollback::{
    DesyncDetector, GameRequest, IntegrityError, PlayerHandle, PlayerKind, RollbackScheduler,
    SchedulerConfig, SchedulerError, SchedulerEvent, SyncTestScheduler, check_events,
};
pub use session::{
    EndReason, Occupant, Role, Session, SessionConfig, SessionError, SessionEvent, SessionState,
    SlotState, SlotTable,
};
pub use simulation::{
    Frame, GameState, MAX_PLAYERS, PackedInput, STATE_SIZE, SavedState, Simulation, StateError,
    fletcher32,
};
