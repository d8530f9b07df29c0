use crate::common::HttpResponse;
use bytes::{Buf, Bytes};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// 터널이 열린 뒤 호출자에게 넘겨지는 스트림
///
/// 응답 헤더와 같은 청크로 도착한 애플리케이션 데이터를 먼저 돌려준 뒤
/// 원래 스트림에서 읽습니다. 쓰기는 그대로 원래 스트림으로 전달됩니다.
#[derive(Debug)]
pub struct TunnelStream<S> {
    inner: S,
    prefix: Bytes,
    response: HttpResponse,
}

impl<S> TunnelStream<S> {
    pub fn new(inner: S, prefix: Bytes, response: HttpResponse) -> Self {
        Self {
            inner,
            prefix,
            response,
        }
    }

    /// 프록시의 CONNECT 응답
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// 원래 스트림과 아직 읽지 않은 선행 데이터로 분리
    pub fn into_parts(self) -> (S, Bytes) {
        (self.inner, self.prefix)
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TunnelStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.prefix.has_remaining() {
            let n = this.prefix.len().min(buf.remaining());
            buf.put_slice(&this.prefix[..n]);
            this.prefix.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TunnelStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
