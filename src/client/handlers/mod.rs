pub mod handshake;
pub mod tunnel;

pub use handshake::{Established, Handshake, Settlement};
pub use tunnel::ProxyConnector;
