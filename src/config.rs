//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MULE__*` 覆盖（双下划线表示嵌套，如 `MULE__SERVER__PORT=25566`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub account: AccountSection,
    pub server: ServerSection,
    pub reconnect: ReconnectSection,
    pub status: StatusSection,
}

/// [account] 段：登录账号与认证方式
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountSection {
    pub username: String,
    /// 离线模式下可为空
    pub password: Option<String>,
    /// 认证方式：offline / mojang / microsoft
    pub auth: String,
}

impl Default for AccountSection {
    fn default() -> Self {
        Self {
            username: "mule".to_string(),
            password: None,
            auth: "offline".to_string(),
        }
    }
}

/// [server] 段：世界服务器地址与协议版本
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub version: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25565,
            version: "1.20.1".to_string(),
        }
    }
}

/// [reconnect] 段：会话结束后的自动重连策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectSection {
    pub enabled: bool,
    /// 重连前等待秒数（重连失败后的单次补偿重试使用同一延迟）
    pub delay_secs: u64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_secs: 5,
        }
    }
}

impl ReconnectSection {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// [status] 段：存活确认 HTTP 端点
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusSection {
    pub bind_addr: String,
}

impl Default for StatusSection {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MULE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MULE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MULE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.account.username, "mule");
        assert_eq!(cfg.account.auth, "offline");
        assert_eq!(cfg.server.port, 25565);
        assert!(cfg.reconnect.enabled);
        assert_eq!(cfg.reconnect.delay(), Duration::from_secs(5));
        assert_eq!(cfg.status.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[account]\nusername = \"hauler\"\n\n[reconnect]\nenabled = false\ndelay_secs = 9\n"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.account.username, "hauler");
        assert!(!cfg.reconnect.enabled);
        assert_eq!(cfg.reconnect.delay_secs, 9);
        // 未覆盖的键保持默认
        assert_eq!(cfg.server.host, "localhost");
    }
}
