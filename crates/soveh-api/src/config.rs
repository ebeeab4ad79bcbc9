//! 서버 설정 관리.
//!
//! 기본값 → `config/default.toml`(선택) → `SOVEH__` 접두사 환경 변수 순으로 덮어씁니다.
//!
//! ```text
//! SOVEH__SERVER__PORT=9000
//! SOVEH__TRACKING__STEP_INTERVAL_MS=500
//! SOVEH__LOGGING__FORMAT=json
//! ```

use std::net::{AddrParseError, SocketAddr};
use std::path::Path;

use serde::Deserialize;
use soveh_tracking::{LogConfig, TrackingConfig};

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 로깅 설정
    pub logging: LogConfig,
    /// 배송 시뮬레이션 설정
    pub tracking: TrackingConfig,
    /// WebSocket 설정
    pub websocket: WebSocketConfig,
    /// 쉼표로 구분된 CORS 허용 origin 목록. 없으면 모든 origin 허용
    pub cors_origins: Option<String>,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
        }
    }
}

impl ServerConfig {
    /// 소켓 주소 변환.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// WebSocket 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// 연결당 송신 버퍼 크기. 가득 차면 해당 연결은 추적에서 제외됨
    pub channel_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다. 파일이 없으면 건너뜁니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8001)?
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("SOVEH")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정 로드.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    /// 설정 값 검증.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.tracking
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        if self.websocket.channel_capacity == 0 {
            return Err(config::ConfigError::Message(
                "websocket.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// CORS 허용 origin 목록.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soveh_tracking::LogFormat;

    fn write_temp_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("soveh-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.tracking.steps, 50);
        assert_eq!(config.websocket.channel_capacity, 64);
        assert_eq!(
            config.server.socket_addr().unwrap().to_string(),
            "127.0.0.1:8001"
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_temp_config(
            r#"
cors_origins = "https://admin.example.com, https://app.example.com"

[server]
port = 9100

[logging]
format = "json"

[tracking]
steps = 20
step_interval_ms = 250
eta_minutes_per_step = 1.5

[tracking.destination]
lat = 19.2
lng = 72.9
"#,
        );

        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.tracking.steps, 20);
        assert_eq!(config.tracking.step_interval_ms, 250);
        assert_eq!(config.tracking.eta_minutes_per_step, 1.5);
        assert_eq!(config.tracking.destination.lat, 19.2);
        assert_eq!(config.tracking.origin.lat, 19.076);
        assert_eq!(config.cors_origin_list().len(), 2);
    }

    #[test]
    fn test_invalid_tracking_config_is_rejected() {
        let path = write_temp_config("[tracking]\nsteps = 0\n");
        let result = AppConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_channel_capacity_is_rejected() {
        let config = AppConfig {
            websocket: WebSocketConfig {
                channel_capacity: 0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
