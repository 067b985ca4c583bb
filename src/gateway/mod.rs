// Observer connection protocol and lifecycle

pub mod connection;
pub mod protocol;

pub use connection::{ConnectionPhase, ObserverConnection};
pub use protocol::{ClientMessage, ServerMessage};
