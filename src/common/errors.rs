use std::io;

/// 상대편이 연결을 끊어서 생긴 에러인지 확인하는 헬퍼 함수
///
/// 핸드셰이크 도중 발생한 읽기 에러의 로그 레벨을 정하는 데 사용합니다.
pub fn is_connection_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}
