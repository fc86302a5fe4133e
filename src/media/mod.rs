pub mod controller;
pub mod player;
pub mod state;

pub use controller::MediaSyncController;
pub use player::{ChannelTransport, PlayerCommand, PlayerEvent, PlayerStatus, PlayerTransport};
pub use state::{MediaSnapshot, MediaSyncConfig};
