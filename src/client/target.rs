use crate::client::{TunnelError, TunnelResult};
use crate::common::ProxyAddress;
use url::{Url, form_urlencoded};

/// 터널로 연결할 목적지
///
/// `tcp://host:port` 형태이며 스킴이 없으면 `tcp://` 로 간주합니다.
/// path/query/fragment 는 하위 커넥터에 전달할 힌트로 그대로 보존합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub uri: String,
    pub host: String,
    pub port: u16,
    pub path: Option<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl Destination {
    pub fn parse(input: &str) -> TunnelResult<Self> {
        let uri = if input.contains("://") {
            input.to_string()
        } else {
            format!("tcp://{}", input)
        };

        let invalid = |reason: &str| TunnelError::InvalidTarget {
            uri: uri.clone(),
            reason: reason.to_string(),
        };

        let url = Url::parse(&uri).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "tcp" {
            return Err(invalid("only the tcp scheme is supported"));
        }
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(invalid("missing host")),
        };
        let port = url.port().ok_or_else(|| invalid("missing port"))?;

        let path = Some(url.path()).filter(|p| !p.is_empty()).map(str::to_string);
        let query = url.query().map(str::to_string);
        let fragment = url.fragment().map(str::to_string);

        Ok(Self {
            uri,
            host,
            port,
            path,
            query,
            fragment,
        })
    }

    /// CONNECT request-target 이자 Host 헤더 값
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// IPv6 괄호를 뗀 호스트 이름
    pub fn hostname(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    /// 프록시 주소 뒤에 목적지의 path, query, fragment 를 붙인 접속 주소
    ///
    /// query 에 `hostname` 이 없으면 목적지 호스트로 채워 넣습니다.
    pub fn proxy_address(&self, proxy: &ProxyAddress) -> ProxyAddress {
        let mut args: Vec<(String, String)> = Vec::new();
        if let Some(query) = &self.query {
            for (key, value) in form_urlencoded::parse(query.as_bytes()) {
                // 같은 이름은 나중 값이 이긴다
                match args.iter_mut().find(|(k, _)| *k == key) {
                    Some(existing) => existing.1 = value.into_owned(),
                    None => args.push((key.into_owned(), value.into_owned())),
                }
            }
        }
        if !args.iter().any(|(k, _)| k == "hostname") {
            args.push(("hostname".to_string(), self.hostname().to_string()));
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&args)
            .finish();

        ProxyAddress {
            path: self.path.clone(),
            query: Some(query),
            fragment: self.fragment.clone(),
            ..proxy.clone()
        }
    }
}
