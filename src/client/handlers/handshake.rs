use crate::client::TunnelError;
use crate::common::{Feed, HandshakeState, HttpResponse, HttpResponseParser};
use bytes::Bytes;
use std::io;
use tracing::{debug, info, warn};

/// 터널 수립 결과
#[derive(Debug)]
pub struct Established {
    pub response: HttpResponse,
    /// 헤더 뒤에 이미 도착한 애플리케이션 데이터
    pub remaining: Bytes,
}

pub type Settlement = Result<Established, TunnelError>;

/// 한 번의 CONNECT 시도를 관리하는 상태 머신
///
/// I/O 를 직접 하지 않고 외부에서 전달되는 이벤트(연결 완료, 데이터, 에러, 종료, 취소)에
/// 반응합니다. 처음 결과가 정해진 뒤의 이벤트는 모두 무시되고 `None` 을 돌려줍니다.
#[derive(Debug)]
pub struct Handshake {
    uri: String,
    state: HandshakeState,
    parser: HttpResponseParser,
}

impl Handshake {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            state: HandshakeState::Dialing,
            parser: HttpResponseParser::new(),
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    /// 현재까지 모은 응답 헤더 바이트
    pub fn buffered(&self) -> &[u8] {
        self.parser.get_buffer()
    }

    /// 하위 커넥터가 스트림을 돌려줌
    pub fn on_dialed(&mut self) {
        if self.state == HandshakeState::Dialing {
            debug!("Proxy stream for {} established, awaiting response", self.uri);
            self.state = HandshakeState::AwaitingHeaders;
        }
    }

    /// 하위 커넥터가 실패함
    pub fn on_dial_error(&mut self, source: io::Error) -> Option<TunnelError> {
        if self.state != HandshakeState::Dialing {
            return None;
        }
        warn!("Failed to connect to proxy for {}: {}", self.uri, source);
        Some(self.fail(TunnelError::ProxyUnreachable {
            uri: self.uri.clone(),
            source,
        }))
    }

    /// 프록시로부터 데이터 청크 수신
    pub fn on_data(&mut self, chunk: &[u8]) -> Option<Settlement> {
        if self.state != HandshakeState::AwaitingHeaders {
            return None;
        }

        match self.parser.extend(chunk) {
            Feed::Incomplete => None,
            Feed::TooLarge => {
                warn!("Proxy response headers for {} exceed 8 KiB", self.uri);
                Some(Err(self.fail(TunnelError::HeadersTooLarge {
                    uri: self.uri.clone(),
                })))
            }
            Feed::Complete => Some(self.classify()),
        }
    }

    /// 헤더가 끝난 응답을 상태 코드에 따라 분류
    fn classify(&mut self) -> Settlement {
        let response = match self.parser.parse() {
            Ok(response) => response,
            Err(source) => {
                warn!("Proxy returned invalid response for {}: {}", self.uri, source);
                return Err(self.fail(TunnelError::MalformedResponse {
                    uri: self.uri.clone(),
                    source,
                }));
            }
        };

        if response.status == 407 {
            warn!("Proxy denied access to {} (407 {})", self.uri, response.reason);
            return Err(self.fail(TunnelError::AuthenticationRejected {
                uri: self.uri.clone(),
                status: response.status,
                reason: response.reason,
            }));
        }
        if !response.is_success() {
            warn!(
                "Proxy refused connection to {} ({} {})",
                self.uri, response.status, response.reason
            );
            return Err(self.fail(TunnelError::ConnectionRefused {
                uri: self.uri.clone(),
                status: response.status,
                reason: response.reason,
            }));
        }

        let remaining = self.parser.take_remaining();
        self.parser.clear();
        self.state = HandshakeState::Established;
        info!(
            "Tunnel to {} established ({} {}), {} bytes already received",
            self.uri,
            response.status,
            response.reason,
            remaining.len()
        );
        Ok(Established {
            response,
            remaining,
        })
    }

    /// 헤더가 끝나기 전에 스트림 에러 발생
    pub fn on_error(&mut self, source: io::Error) -> Option<TunnelError> {
        if self.state != HandshakeState::AwaitingHeaders {
            return None;
        }
        if crate::common::is_connection_error(&source) {
            debug!("Proxy stream for {} reset: {}", self.uri, source);
        } else {
            warn!("Proxy stream error for {}: {}", self.uri, source);
        }
        Some(self.fail(TunnelError::Stream {
            uri: self.uri.clone(),
            source,
        }))
    }

    /// 헤더가 끝나기 전에 스트림이 닫힘
    pub fn on_close(&mut self) -> Option<TunnelError> {
        if self.state != HandshakeState::AwaitingHeaders {
            return None;
        }
        warn!("Proxy closed connection for {} before responding", self.uri);
        Some(self.fail(TunnelError::ConnectionLost {
            uri: self.uri.clone(),
        }))
    }

    /// 호출자의 취소 요청. 이미 결과가 정해졌다면 아무 일도 하지 않는다
    pub fn cancel(&mut self) -> Option<TunnelError> {
        if self.is_settled() {
            return None;
        }
        info!("Connection to {} cancelled while {:?}", self.uri, self.state);
        self.parser.clear();
        self.state = HandshakeState::Cancelled;
        Some(TunnelError::Aborted {
            uri: self.uri.clone(),
        })
    }

    fn fail(&mut self, err: TunnelError) -> TunnelError {
        self.parser.clear();
        self.state = HandshakeState::Failed;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ErrorKind;
    use crate::common::MAX_HEADER_SIZE;

    const URI: &str = "tcp://example.com:443";

    fn awaiting() -> Handshake {
        let mut handshake = Handshake::new(URI);
        handshake.on_dialed();
        assert_eq!(handshake.state(), HandshakeState::AwaitingHeaders);
        handshake
    }

    fn expect_err(settlement: Option<Settlement>) -> TunnelError {
        match settlement {
            Some(Err(err)) => err,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_success_with_remaining() {
        let mut handshake = awaiting();
        let established = handshake
            .on_data(b"HTTP/1.1 200 Connection Established\r\n\r\nHELLO")
            .unwrap()
            .unwrap();
        assert_eq!(established.response.status, 200);
        assert_eq!(established.remaining, Bytes::from_static(b"HELLO"));
        assert_eq!(handshake.state(), HandshakeState::Established);
        assert!(handshake.buffered().is_empty());
    }

    #[test]
    fn test_split_chunks() {
        let mut handshake = awaiting();
        assert!(handshake.on_data(b"HTTP/1.1 200 OK\r").is_none());
        assert!(handshake.on_data(b"\nVia: proxy\r\n").is_none());
        assert!(handshake.on_data(b"\r").is_none());
        let established = handshake.on_data(b"\nAB").unwrap().unwrap();
        assert_eq!(established.remaining, Bytes::from_static(b"AB"));
    }

    #[test]
    fn test_status_classification() {
        let cases: [(&[u8], ErrorKind); 5] = [
            (
                b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n",
                ErrorKind::AuthenticationRejected,
            ),
            (b"HTTP/1.1 403 Forbidden\r\n\r\n", ErrorKind::ConnectionRefused),
            (b"HTTP/1.1 502 Bad Gateway\r\n\r\n", ErrorKind::ConnectionRefused),
            (b"HTTP/1.1 101 Switching Protocols\r\n\r\n", ErrorKind::ConnectionRefused),
            (b"garbage\r\n\r\n", ErrorKind::MalformedResponse),
        ];
        for (response, kind) in cases {
            let mut handshake = awaiting();
            let err = expect_err(handshake.on_data(response));
            assert_eq!(err.kind(), kind);
            assert_eq!(handshake.state(), HandshakeState::Failed);
        }
    }

    #[test]
    fn test_success_with_many_headers() {
        let mut response = b"HTTP/1.1 200 Connection Established\r\n".to_vec();
        for i in 0..65 {
            response.extend_from_slice(format!("X-{}: y\r\n", i).as_bytes());
        }
        response.extend_from_slice(b"\r\n");

        let mut handshake = awaiting();
        let established = handshake.on_data(&response).unwrap().unwrap();
        assert_eq!(established.response.headers.len(), 65);
        assert_eq!(handshake.state(), HandshakeState::Established);
    }

    #[test]
    fn test_refusal_carries_reason() {
        let mut handshake = awaiting();
        let err = expect_err(handshake.on_data(b"HTTP/1.1 503 Service Unavailable\r\n\r\n"));
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("503 (Service Unavailable)"));
    }

    #[test]
    fn test_headers_too_large() {
        let mut handshake = awaiting();
        let err = expect_err(handshake.on_data(&vec![b'a'; MAX_HEADER_SIZE + 1]));
        assert_eq!(err.kind(), ErrorKind::HeadersTooLarge);
        assert!(handshake.buffered().is_empty());
    }

    #[test]
    fn test_close_and_error_before_headers() {
        let mut handshake = awaiting();
        handshake.on_data(b"HTTP/1.1 200 OK\r\n");
        assert_eq!(
            handshake.on_close().unwrap().kind(),
            ErrorKind::ConnectionLost
        );

        let mut handshake = awaiting();
        let err = handshake
            .on_error(io::Error::new(io::ErrorKind::Other, "boom"))
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::StreamError);
    }

    #[test]
    fn test_dial_error() {
        let mut handshake = Handshake::new(URI);
        let err = handshake
            .on_dial_error(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ProxyUnreachable);
        assert!(handshake.cancel().is_none());
    }

    #[test]
    fn test_settles_at_most_once() {
        let mut handshake = awaiting();
        assert!(handshake.on_data(b"HTTP/1.1 200 OK\r\n\r\n").unwrap().is_ok());

        assert!(handshake.cancel().is_none());
        assert!(handshake.on_data(b"HTTP/1.1 200 OK\r\n\r\n").is_none());
        assert!(handshake.on_close().is_none());
        assert!(handshake
            .on_error(io::Error::new(io::ErrorKind::Other, "late"))
            .is_none());
        assert!(handshake.buffered().is_empty());
        assert_eq!(handshake.state(), HandshakeState::Established);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut handshake = Handshake::new(URI);
        assert_eq!(handshake.cancel().unwrap().kind(), ErrorKind::Aborted);
        assert!(handshake.cancel().is_none());

        handshake.on_dialed();
        assert_eq!(handshake.state(), HandshakeState::Cancelled);
        assert!(handshake.on_data(b"HTTP/1.1 200 OK\r\n\r\n").is_none());
    }
}
