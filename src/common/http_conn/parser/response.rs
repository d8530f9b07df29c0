use crate::common::http_conn::HttpResponse;
use bytes::{Bytes, BytesMut};
use http::HeaderMap;
use httparse;
use std::io;

/// 프록시 응답 헤더의 최대 크기 (8 KiB)
pub const MAX_HEADER_SIZE: usize = 8192;

const TERMINATOR: &[u8] = b"\r\n\r\n";

/// 버퍼에 데이터를 추가한 결과
#[derive(Debug, PartialEq)]
pub enum Feed {
    /// 아직 헤더가 끝나지 않음
    Incomplete,
    /// 헤더 끝(빈 줄)을 찾음
    Complete,
    /// 종료 표시 없이 최대 크기를 넘김. 버퍼에는 추가하지 않음
    TooLarge,
}

/// CONNECT 응답 헤더를 모으고 파싱하는 구조체
///
/// 청크가 어떻게 나뉘어 도착하든 같은 결과를 내며, 종료 표시 없이
/// [`MAX_HEADER_SIZE`] 를 넘는 바이트는 저장하지 않습니다.
#[derive(Debug)]
pub struct HttpResponseParser {
    buf: BytesMut,
    headers_end: Option<usize>,
}

impl HttpResponseParser {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
            headers_end: None,
        }
    }

    /// 버퍼에 데이터 추가
    pub fn extend(&mut self, data: &[u8]) -> Feed {
        if self.headers_end.is_some() {
            // 헤더 이후의 데이터는 그대로 뒤에 붙는다
            self.buf.extend_from_slice(data);
            return Feed::Complete;
        }

        if let Some(end) = self.find_terminator(data) {
            self.buf.extend_from_slice(data);
            self.headers_end = Some(end);
            return Feed::Complete;
        }

        if self.buf.len() + data.len() > MAX_HEADER_SIZE {
            return Feed::TooLarge;
        }
        self.buf.extend_from_slice(data);
        Feed::Incomplete
    }

    /// 버퍼와 새 청크를 이어 붙였을 때 첫 종료 표시가 끝나는 위치
    fn find_terminator(&self, data: &[u8]) -> Option<usize> {
        // 청크 경계에 걸친 종료 표시는 기존 버퍼의 마지막 3바이트 안에서 시작한다
        let keep = self.buf.len().min(TERMINATOR.len() - 1);
        let seam_start = self.buf.len() - keep;
        let mut seam = Vec::with_capacity(keep + TERMINATOR.len() - 1);
        seam.extend_from_slice(&self.buf[seam_start..]);
        seam.extend_from_slice(&data[..data.len().min(TERMINATOR.len() - 1)]);

        if let Some(pos) = find(&seam, TERMINATOR) {
            return Some(seam_start + pos + TERMINATOR.len());
        }
        find(data, TERMINATOR).map(|pos| self.buf.len() + pos + TERMINATOR.len())
    }

    /// 헤더 블록 파싱
    pub fn parse(&self) -> Result<HttpResponse, io::Error> {
        let Some(headers_end) = self.headers_end else {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "incomplete HTTP response",
            ));
        };
        let block = &self.buf[..headers_end];

        // 헤더 수는 줄 수를 넘지 않으며, 줄 수는 8 KiB 제한으로 묶인다
        let lines = block.iter().filter(|&&b| b == b'\n').count();
        let mut headers = vec![httparse::EMPTY_HEADER; lines];
        let mut res = httparse::Response::new(&mut headers);

        match res.parse(block) {
            Ok(httparse::Status::Complete(_)) => {
                let status = res.code.unwrap_or_default();
                let reason = res.reason.unwrap_or_default().to_string();
                let version = match res.version.unwrap_or(1) {
                    0 => "HTTP/1.0",
                    _ => "HTTP/1.1",
                }
                .to_string();

                // 헤더 맵 구성
                let mut header_map = HeaderMap::new();
                for header in res.headers.iter() {
                    if let Ok(name) = http::header::HeaderName::from_bytes(header.name.as_bytes())
                    {
                        if let Ok(val) = http::header::HeaderValue::from_bytes(header.value) {
                            header_map.append(name, val);
                        }
                    }
                }

                Ok(HttpResponse {
                    status,
                    reason,
                    version,
                    headers: header_map,
                })
            }
            Ok(httparse::Status::Partial) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "truncated HTTP response header",
            )),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string())),
        }
    }

    /// 헤더 이후에 이미 도착한 애플리케이션 데이터를 꺼낸다
    pub fn take_remaining(&mut self) -> Bytes {
        match self.headers_end {
            Some(end) => self.buf.split_off(end).freeze(),
            None => Bytes::new(),
        }
    }

    /// 버퍼 내용 가져오기
    pub fn get_buffer(&self) -> &[u8] {
        &self.buf
    }

    /// 버퍼 해제
    pub fn clear(&mut self) {
        self.buf = BytesMut::new();
        self.headers_end = None;
    }
}

impl Default for HttpResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
