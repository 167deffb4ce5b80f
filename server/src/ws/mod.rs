pub mod actor;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod rooms;

pub use registry::{ConnectionId, ConnectionRegistry, ConnectionSender};
pub use rooms::PairRooms;
