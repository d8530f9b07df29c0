use std::fmt;
use std::path::PathBuf;
use url::form_urlencoded;

/// 프록시까지의 전송 방식
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// 평문 TCP
    Tcp,
    /// TLS로 감싼 TCP (실제 TLS 협상은 하위 커넥터 담당)
    Tls,
    /// 로컬 유닉스 소켓
    Unix(PathBuf),
}

impl Transport {
    pub fn scheme(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Tls => "tls",
            Transport::Unix(_) => "unix",
        }
    }
}

/// 하위 커넥터에 넘기는 프록시 접속 주소
///
/// 와이어로 전송되지 않습니다. 목적지의 path/query/fragment 가 그대로 붙어
/// 하위 커넥터에 힌트(예: `hostname`)를 전달하는 용도로 쓰입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAddress {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub path: Option<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl ProxyAddress {
    pub fn new(transport: Transport, host: impl Into<String>, port: u16) -> Self {
        Self {
            transport,
            host: host.into(),
            port,
            path: None,
            query: None,
            fragment: None,
        }
    }

    /// 고정된 유닉스 소켓 주소
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::new(Transport::Unix(path.into()), "", 0)
    }

    /// 쿼리 문자열의 `hostname` 파라미터
    pub fn hostname(&self) -> Option<String> {
        self.query_param("hostname")
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .last()
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.transport {
            Transport::Unix(path) => write!(f, "unix://{}", path.display())?,
            transport => write!(f, "{}://{}:{}", transport.scheme(), self.host, self.port)?,
        }
        if let Some(path) = &self.path {
            f.write_str(path)?;
        }
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_hints() {
        let mut addr = ProxyAddress::new(Transport::Tls, "proxy.example", 443);
        addr.path = Some("/path".to_string());
        addr.query = Some("hostname=example.com".to_string());
        addr.fragment = Some("frag".to_string());

        assert_eq!(
            addr.to_string(),
            "tls://proxy.example:443/path?hostname=example.com#frag"
        );
        assert_eq!(addr.hostname().as_deref(), Some("example.com"));
    }

    #[test]
    fn test_display_unix() {
        let addr = ProxyAddress::unix("/tmp/proxy.sock");
        assert_eq!(addr.to_string(), "unix:///tmp/proxy.sock");
        assert_eq!(addr.hostname(), None);
    }
}
