//! HTTP CONNECT 메시지 관련 타입
//!
//! 요청 직렬화, 응답 헤더 파싱, 핸드셰이크 상태를 정의합니다.

pub mod parser;
pub mod proxy_state;
pub mod types;

pub use parser::*;
pub use proxy_state::*;
pub use types::*;
