//! 공통 모듈
//!
//! 프록시 주소, HTTP 응답 파서 등 클라이언트 전반에서 사용하는 타입을 정의합니다.

pub mod errors;
pub mod http_conn;
pub mod types;

// 공통 타입들을 재내보내기
pub use errors::*;
pub use http_conn::*;
pub use types::*;
