// Connected observer tracking

mod handle;
mod registry;

pub use handle::{ObserverHandle, ObserverId, OutboundFrame, SendError};
pub use registry::ObserverRegistry;
