use http::header::{HOST, PROXY_AUTHORIZATION};
use http::{HeaderMap, HeaderValue};

/// 프록시가 돌려준 CONNECT 응답 헤더
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub version: String,
    pub headers: HeaderMap,
}

impl HttpResponse {
    /// 2xx 응답이면 터널이 열린 것
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// CONNECT 요청
///
/// request-target 은 항상 `host:port` 형태이며 전체 URL 을 쓰지 않습니다.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub authority: String,
    pub headers: HeaderMap,
}

impl ConnectRequest {
    /// 기본 헤더 위에 `Host` 와 `Proxy-Authorization` 을 덮어써서 요청을 만든다
    pub fn new(
        authority: String,
        defaults: &HeaderMap,
        authorization: Option<&HeaderValue>,
    ) -> Result<Self, http::header::InvalidHeaderValue> {
        let mut headers = defaults.clone();
        headers.insert(HOST, HeaderValue::from_str(&authority)?);
        // 인증이 설정되지 않았다면 호출자가 넣은 Proxy-Authorization 을 그대로 둔다
        if let Some(value) = authorization {
            headers.insert(PROXY_AUTHORIZATION, value.clone());
        }
        Ok(Self { authority, headers })
    }

    /// 원시 HTTP/1.1 바이트로 직렬화
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut request_bytes = Vec::with_capacity(128);

        // 1. 요청 라인
        let request_line = format!("CONNECT {} HTTP/1.1\r\n", self.authority);
        request_bytes.extend_from_slice(request_line.as_bytes());

        // 2. Host 를 먼저, 나머지 헤더는 그 뒤에
        if let Some(host) = self.headers.get(HOST) {
            push_header(&mut request_bytes, HOST.as_str(), host);
        }
        for (name, value) in self.headers.iter() {
            if name == HOST {
                continue;
            }
            push_header(&mut request_bytes, name.as_str(), value);
        }

        // 3. 빈 줄 (본문 없음)
        request_bytes.extend_from_slice(b"\r\n");

        request_bytes
    }
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &HeaderValue) {
    buf.extend_from_slice(canonical_name(name).as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// `proxy-authorization` -> `Proxy-Authorization`
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_request_minimal() {
        let req = ConnectRequest::new("example.com:443".to_string(), &HeaderMap::new(), None)
            .unwrap();
        assert_eq!(
            req.to_bytes(),
            b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n"
        );
    }

    #[test]
    fn test_mandatory_headers_win() {
        let mut defaults = HeaderMap::new();
        defaults.insert(HOST, HeaderValue::from_static("evil.example"));
        defaults.insert(
            PROXY_AUTHORIZATION,
            HeaderValue::from_static("Basic Zm9vOmJhcg=="),
        );
        defaults.insert("user-agent", HeaderValue::from_static("tunnel/1.0"));

        let auth = HeaderValue::from_static("Basic YWxpY2U6czNjcjN0");
        let req = ConnectRequest::new("example.com:443".to_string(), &defaults, Some(&auth))
            .unwrap();
        let text = String::from_utf8(req.to_bytes()).unwrap();

        assert!(text.starts_with("CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n"));
        assert!(text.contains("Proxy-Authorization: Basic YWxpY2U6czNjcjN0\r\n"));
        assert!(text.contains("User-Agent: tunnel/1.0\r\n"));
        assert!(!text.contains("evil.example"));
        assert!(!text.contains("Zm9vOmJhcg=="));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_response_success_range() {
        let mut res = HttpResponse {
            status: 200,
            reason: "OK".to_string(),
            version: "HTTP/1.1".to_string(),
            headers: HeaderMap::new(),
        };
        assert!(res.is_success());
        res.status = 299;
        assert!(res.is_success());
        res.status = 300;
        assert!(!res.is_success());
        res.status = 199;
        assert!(!res.is_success());
    }
}
