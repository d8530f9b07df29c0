/// CONNECT 핸드셰이크 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// 하위 커넥터가 프록시에 연결하는 중
    Dialing,
    /// 요청을 보내고 응답 헤더를 기다리는 중
    AwaitingHeaders,
    /// 터널 수립 완료, 스트림은 호출자에게 넘어감
    Established,
    /// 분류된 에러로 실패
    Failed,
    /// 호출자가 취소함
    Cancelled,
}

impl HandshakeState {
    /// 한 번 정해지면 다시 바뀌지 않는 상태인지
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            HandshakeState::Established | HandshakeState::Failed | HandshakeState::Cancelled
        )
    }
}
