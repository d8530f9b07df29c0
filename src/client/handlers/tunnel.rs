use crate::client::handlers::Handshake;
use crate::client::{Connector, Destination, ProxyConfig, TunnelError, TunnelResult, TunnelStream};
use crate::common::ConnectRequest;
use http::HeaderMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const READ_CHUNK_SIZE: usize = 4096;

/// HTTP CONNECT 프록시를 거쳐 목적지로 연결하는 커넥터
///
/// 성공하면 직접 연결한 것과 같은 바이트 스트림을 돌려주므로 그 위에
/// TLS 등 다른 프로토콜을 그대로 올릴 수 있습니다. 프록시 연결은 재사용하지 않습니다.
#[derive(Debug, Clone)]
pub struct ProxyConnector<C> {
    config: Arc<ProxyConfig>,
    connector: C,
}

impl<C: Connector> ProxyConnector<C> {
    pub fn new(proxy_url: &str, connector: C) -> TunnelResult<Self> {
        Self::with_headers(proxy_url, connector, HeaderMap::new())
    }

    /// CONNECT 요청마다 붙일 기본 헤더를 지정
    ///
    /// `Host` 와 (인증이 설정된 경우) `Proxy-Authorization` 은 항상 덮어씁니다.
    pub fn with_headers(proxy_url: &str, connector: C, headers: HeaderMap) -> TunnelResult<Self> {
        let config = ProxyConfig::parse(proxy_url, headers)?;
        info!(
            "Using HTTP CONNECT proxy at {}{}",
            config.address,
            if config.authorization.is_some() {
                " with basic auth"
            } else {
                ""
            }
        );
        Ok(Self {
            config: Arc::new(config),
            connector,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// 목적지까지 터널을 연다. 반환된 future 를 drop 하면 시도가 취소된다
    pub async fn connect(&self, destination: &str) -> TunnelResult<TunnelStream<C::Stream>> {
        self.connect_with_cancel(destination, &CancellationToken::new())
            .await
    }

    /// 취소 토큰과 함께 터널을 연다
    ///
    /// 결과가 정해지기 전에 토큰이 취소되면 `Aborted` 로 끝나며, 이미 열린 프록시
    /// 스트림은 닫히고 진행 중인 연결 시도는 중단됩니다. 결과가 정해진 뒤의 취소는 무시됩니다.
    pub async fn connect_with_cancel(
        &self,
        destination: &str,
        cancel: &CancellationToken,
    ) -> TunnelResult<TunnelStream<C::Stream>> {
        let destination = Destination::parse(destination)?;
        let request = ConnectRequest::new(
            destination.authority(),
            &self.config.headers,
            self.config.authorization.as_ref(),
        )
        .map_err(|e| TunnelError::InvalidTarget {
            uri: destination.uri.clone(),
            reason: e.to_string(),
        })?
        .to_bytes();
        let address = self.config.dial_address(&destination);
        let mut handshake = Handshake::new(destination.uri.as_str());

        debug!("Connecting to {} via {}", destination.uri, address);

        // 1. 프록시 연결
        // 취소되면 진행 중인 연결 future 는 여기서 drop 된다
        let dialed = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(handshake.cancel()),
            result = self.connector.connect(&address) => result.map_err(|e| handshake.on_dial_error(e)),
        };
        let mut stream = match dialed {
            Ok(stream) => {
                handshake.on_dialed();
                stream
            }
            Err(failed) => {
                return Err(failed.unwrap_or_else(|| TunnelError::Aborted {
                    uri: destination.uri.clone(),
                }));
            }
        };

        // 2. CONNECT 요청 전송
        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => handshake.cancel(),
            result = write_request(&mut stream, &request) => match result {
                Ok(()) => None,
                Err(e) => handshake.on_error(e),
            },
        };
        if let Some(err) = written {
            drop(stream);
            return Err(err);
        }
        debug!("Sent CONNECT {} ({} bytes)", destination.authority(), request.len());

        // 3. 응답 헤더가 끝날 때까지 읽기
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let settlement = tokio::select! {
                biased;
                _ = cancel.cancelled() => handshake.cancel().map(Err),
                read = stream.read(&mut chunk) => match read {
                    Ok(0) => handshake.on_close().map(Err),
                    Ok(n) => handshake.on_data(&chunk[..n]),
                    Err(e) => handshake.on_error(e).map(Err),
                },
            };

            match settlement {
                Some(Ok(established)) => {
                    return Ok(TunnelStream::new(
                        stream,
                        established.remaining,
                        established.response,
                    ));
                }
                Some(Err(err)) => {
                    // 실패 시 에러를 알리기 전에 스트림을 닫는다
                    drop(stream);
                    return Err(err);
                }
                None => {}
            }
        }
    }
}

async fn write_request<S>(stream: &mut S, request: &[u8]) -> std::io::Result<()>
where
    S: tokio::io::AsyncWrite + Unpin,
{
    stream.write_all(request).await?;
    stream.flush().await
}
