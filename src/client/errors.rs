use std::io;
use thiserror::Error;

/// 터널 연결 실패 원인
///
/// 어떤 에러도 내부에서 재시도하지 않습니다. 재시도 정책은 호출자 몫입니다.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("Invalid proxy URL \"{url}\": {reason}")]
    InvalidProxyUrl { url: String, reason: String },

    #[error("Invalid target URI \"{uri}\": {reason} (EINVAL)")]
    InvalidTarget { uri: String, reason: String },

    #[error("Connection to {uri} failed because connection to proxy failed (ECONNREFUSED)")]
    ProxyUnreachable {
        uri: String,
        #[source]
        source: io::Error,
    },

    #[error("Connection to {uri} cancelled while waiting for proxy (ECONNABORTED)")]
    Aborted { uri: String },

    #[error("Connection to {uri} failed because proxy returned invalid response (EBADMSG)")]
    MalformedResponse {
        uri: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "Connection to {uri} failed because proxy denied access with HTTP error code {status} ({reason}) (EACCES)"
    )]
    AuthenticationRejected {
        uri: String,
        status: u16,
        reason: String,
    },

    #[error(
        "Connection to {uri} failed because proxy refused connection with HTTP error code {status} ({reason}) (ECONNREFUSED)"
    )]
    ConnectionRefused {
        uri: String,
        status: u16,
        reason: String,
    },

    #[error(
        "Connection to {uri} failed because proxy response headers exceed maximum of 8 KiB (EMSGSIZE)"
    )]
    HeadersTooLarge { uri: String },

    #[error("Connection to {uri} failed because connection to proxy caused a stream error (EIO)")]
    Stream {
        uri: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "Connection to {uri} failed because connection to proxy was lost while waiting for response (ECONNRESET)"
    )]
    ConnectionLost { uri: String },
}

/// 매칭용 에러 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidProxyUrl,
    InvalidTarget,
    ProxyUnreachable,
    Aborted,
    MalformedResponse,
    AuthenticationRejected,
    ConnectionRefused,
    HeadersTooLarge,
    StreamError,
    ConnectionLost,
}

impl TunnelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TunnelError::InvalidProxyUrl { .. } => ErrorKind::InvalidProxyUrl,
            TunnelError::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            TunnelError::ProxyUnreachable { .. } => ErrorKind::ProxyUnreachable,
            TunnelError::Aborted { .. } => ErrorKind::Aborted,
            TunnelError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            TunnelError::AuthenticationRejected { .. } => ErrorKind::AuthenticationRejected,
            TunnelError::ConnectionRefused { .. } => ErrorKind::ConnectionRefused,
            TunnelError::HeadersTooLarge { .. } => ErrorKind::HeadersTooLarge,
            TunnelError::Stream { .. } => ErrorKind::StreamError,
            TunnelError::ConnectionLost { .. } => ErrorKind::ConnectionLost,
        }
    }

    /// 프록시가 돌려준 HTTP 상태 코드 (정책 거부일 때만)
    pub fn status(&self) -> Option<u16> {
        match self {
            TunnelError::AuthenticationRejected { status, .. }
            | TunnelError::ConnectionRefused { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// POSIX errno 값
    pub fn errno(&self) -> i32 {
        match self.kind() {
            ErrorKind::InvalidProxyUrl | ErrorKind::InvalidTarget => 22,
            ErrorKind::ProxyUnreachable | ErrorKind::ConnectionRefused => 111,
            ErrorKind::Aborted => 103,
            ErrorKind::MalformedResponse => 74,
            ErrorKind::AuthenticationRejected => 13,
            ErrorKind::HeadersTooLarge => 90,
            ErrorKind::StreamError => 5,
            ErrorKind::ConnectionLost => 104,
        }
    }

    pub fn errno_name(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidProxyUrl | ErrorKind::InvalidTarget => "EINVAL",
            ErrorKind::ProxyUnreachable | ErrorKind::ConnectionRefused => "ECONNREFUSED",
            ErrorKind::Aborted => "ECONNABORTED",
            ErrorKind::MalformedResponse => "EBADMSG",
            ErrorKind::AuthenticationRejected => "EACCES",
            ErrorKind::HeadersTooLarge => "EMSGSIZE",
            ErrorKind::StreamError => "EIO",
            ErrorKind::ConnectionLost => "ECONNRESET",
        }
    }
}

impl From<TunnelError> for io::Error {
    fn from(err: TunnelError) -> Self {
        let kind = match err.kind() {
            ErrorKind::InvalidProxyUrl | ErrorKind::InvalidTarget => io::ErrorKind::InvalidInput,
            ErrorKind::ProxyUnreachable | ErrorKind::ConnectionRefused => {
                io::ErrorKind::ConnectionRefused
            }
            ErrorKind::Aborted => io::ErrorKind::ConnectionAborted,
            ErrorKind::MalformedResponse | ErrorKind::HeadersTooLarge => {
                io::ErrorKind::InvalidData
            }
            ErrorKind::AuthenticationRejected => io::ErrorKind::PermissionDenied,
            ErrorKind::StreamError => io::ErrorKind::Other,
            ErrorKind::ConnectionLost => io::ErrorKind::ConnectionReset,
        };
        io::Error::new(kind, err)
    }
}

pub type TunnelResult<T> = std::result::Result<T, TunnelError>;
