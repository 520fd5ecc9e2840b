// Managers Module
//
// Focused manager classes applying the Single Responsibility Principle.
//
// Each manager handles one specific concern:
// - BroadcastChannelManager: Tokio broadcast channel management
// - CueManager: Cue player lifecycle and triggering

pub mod broadcast_manager;
pub mod cue_manager;

pub use broadcast_manager::BroadcastChannelManager;
pub use cue_manager::CueManager;
