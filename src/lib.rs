pub mod client;
pub mod common;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use client::{
    Args, Connector, Destination, ErrorKind, Handshake, ProxyConfig, ProxyConnector, RawStream,
    TcpConnector, TunnelError, TunnelResult, TunnelStream,
};
pub use common::{
    ConnectRequest, HandshakeState, HttpResponse, HttpResponseParser, MAX_HEADER_SIZE,
    ProxyAddress, Transport,
};
pub use tokio_util::sync::CancellationToken;

pub mod prelude {
    pub use crate::client::{
        Connector, ErrorKind, ProxyConnector, TcpConnector, TunnelError, TunnelResult,
        TunnelStream,
    };
    pub use crate::common::{ProxyAddress, Transport};
}
