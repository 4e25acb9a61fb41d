//! Link to the external bridge peer: wire codec + transport seam.

pub mod codec;
pub mod transport;

pub use codec::{InboundEvent, InboundMessage};
pub use transport::{BridgeTransport, FrameSink, FrameStream, WsBridgeTransport};
