use crate::common::{ProxyAddress, Transport};
use async_trait::async_trait;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::time::{Duration, timeout};
use tracing::debug;

/// 프록시까지 원시 바이트 스트림을 여는 하위 커넥터
///
/// 반환된 future 를 drop 하면 진행 중인 연결 시도도 취소되어야 합니다.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn connect(&self, address: &ProxyAddress) -> io::Result<Self::Stream>;
}

#[async_trait]
impl<C: Connector> Connector for std::sync::Arc<C> {
    type Stream = C::Stream;

    async fn connect(&self, address: &ProxyAddress) -> io::Result<Self::Stream> {
        (**self).connect(address).await
    }
}

/// TCP 또는 유닉스 소켓으로 연결하는 기본 커넥터
///
/// TLS 전송은 지원하지 않습니다. `https://` 프록시에는 TLS 를 처리하는 커넥터를 사용하세요.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    connection_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 연결 타임아웃 (초), 0 이면 제한 없음
    pub fn with_timeout(seconds: u64) -> Self {
        Self {
            connection_timeout: (seconds > 0).then(|| Duration::from_secs(seconds)),
        }
    }

    async fn dial(&self, address: &ProxyAddress) -> io::Result<RawStream> {
        match &address.transport {
            Transport::Tcp => {
                let host = address
                    .host
                    .trim_start_matches('[')
                    .trim_end_matches(']');
                let stream = TcpStream::connect((host, address.port)).await?;

                // Set TCP_NODELAY to improve latency
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY on proxy stream: {}", e);
                }
                let socket_ref = socket2::SockRef::from(&stream);
                if let Err(e) = socket_ref.set_keepalive(true) {
                    debug!("Failed to set SO_KEEPALIVE on proxy stream: {}", e);
                }
                Ok(RawStream::Tcp(stream))
            }
            #[cfg(unix)]
            Transport::Unix(path) => Ok(RawStream::Unix(UnixStream::connect(path).await?)),
            #[cfg(not(unix))]
            Transport::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "local socket transport is only available on unix",
            )),
            Transport::Tls => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("TLS transport to {} is not supported by TcpConnector", address),
            )),
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = RawStream;

    async fn connect(&self, address: &ProxyAddress) -> io::Result<RawStream> {
        debug!("Dialing proxy at {}", address);
        match self.connection_timeout {
            Some(duration) => timeout(duration, self.dial(address))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("Connection timeout while connecting to {}", address),
                    )
                })?,
            None => self.dial(address).await,
        }
    }
}

/// [`TcpConnector`] 가 만드는 스트림
#[derive(Debug)]
pub enum RawStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl AsyncRead for RawStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            RawStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(unix)]
            RawStream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for RawStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            RawStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(unix)]
            RawStream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            RawStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            #[cfg(unix)]
            RawStream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            RawStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(unix)]
            RawStream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_dial() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"pong").await.unwrap();
        });

        let connector = TcpConnector::with_timeout(5);
        let mut stream = connector
            .connect(&ProxyAddress::new(Transport::Tcp, "127.0.0.1", addr.port()))
            .await
            .unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_dial() {
        let path = std::env::temp_dir().join(format!("proxy-tunnel-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let listener = tokio::net::UnixListener::bind(&path).unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"unix").await.unwrap();
        });

        let mut stream = TcpConnector::new()
            .connect(&ProxyAddress::unix(path.clone()))
            .await
            .unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"unix");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_tls_unsupported() {
        let err = TcpConnector::new()
            .connect(&ProxyAddress::new(Transport::Tls, "127.0.0.1", 443))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
