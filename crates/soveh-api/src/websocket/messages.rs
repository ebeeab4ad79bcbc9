//! WebSocket 메시지 타입.
//!
//! 서버 → 클라이언트 추적 이벤트는 `soveh_tracking::TrackingEvent`를 그대로 직렬화하며,
//! 여기서는 연결 유지용 제어 메시지만 정의합니다.

use serde::{Deserialize, Serialize};

/// WebSocket 에러.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("잘못된 메시지 형식: {0}")]
    InvalidMessage(String),
    #[error("직렬화 실패: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 클라이언트에서 서버로 보내는 메시지.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 핑 (연결 유지)
    Ping,
}

impl ClientMessage {
    /// 텍스트 프레임 파싱.
    ///
    /// 평문 `ping`과 `{"type": "ping"}` 둘 다 핑으로 인식합니다.
    pub fn parse(text: &str) -> Result<Self, WsError> {
        let text = text.trim();
        if text == "ping" {
            return Ok(Self::Ping);
        }
        serde_json::from_str(text).map_err(|e| WsError::InvalidMessage(e.to_string()))
    }
}

/// 서버에서 클라이언트로 보내는 제어 메시지.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 퐁 응답
    Pong,
}

impl ServerMessage {
    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(WsError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_ping() {
        assert_eq!(ClientMessage::parse("ping").unwrap(), ClientMessage::Ping);
        assert_eq!(ClientMessage::parse(" ping\n").unwrap(), ClientMessage::Ping);
    }

    #[test]
    fn test_parse_json_ping() {
        assert_eq!(
            ClientMessage::parse(r#"{"type": "ping"}"#).unwrap(),
            ClientMessage::Ping
        );
    }

    #[test]
    fn test_parse_unknown_is_error() {
        assert!(ClientMessage::parse("hello").is_err());
        assert!(ClientMessage::parse(r#"{"type": "subscribe"}"#).is_err());
        assert!(ClientMessage::parse("PING").is_err());
    }

    #[test]
    fn test_pong_wire_format() {
        assert_eq!(ServerMessage::Pong.to_json().unwrap(), r#"{"type":"pong"}"#);
    }
}
