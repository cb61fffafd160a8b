//! 配置管理
//!
//! 从可选的配置文件与 `HOSPITAL__*` 环境变量加载客户端配置，
//! 例如 `HOSPITAL__API__BASE_URL=http://10.0.0.2:8083`。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// 客户端完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 后端接口配置
    pub api: ApiConfig,
    /// 会话配置
    pub session: SessionConfig,
    /// 首页配置
    pub dashboard: DashboardConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 后端接口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 后端地址
    pub base_url: String,
    /// API前缀
    pub prefix: String,
    /// 首页概览路径（不在API前缀下）
    pub index_path: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

/// 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 令牌存储键
    pub token_key: String,
    /// 令牌存储目录，未设置时令牌仅保存在内存中
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// 最近动态条数
    pub activity_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8083".to_string(),
            prefix: "/api".to_string(),
            index_path: "/index/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_key: "hospital-auth-token".to_string(),
            state_dir: None,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { activity_limit: 6 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// 单条校验规则
struct ValidationRule {
    field_path: &'static str,
    validator: fn(&AppConfig) -> bool,
    error_message: &'static str,
}

/// 配置验证器
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "api.base_url",
                validator: |config| !config.api.base_url.trim().is_empty(),
                error_message: "API base url cannot be empty",
            },
            ValidationRule {
                field_path: "api.timeout_secs",
                validator: |config| config.api.timeout_secs > 0,
                error_message: "API timeout cannot be 0",
            },
            ValidationRule {
                field_path: "dashboard.activity_limit",
                validator: |config| config.dashboard.activity_limit > 0,
                error_message: "Activity limit cannot be 0",
            },
        ];

        Self { validation_rules }
    }

    pub fn validate(&self, config: &AppConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if !(rule.validator)(config) {
                error!("Configuration validation failed for {}", rule.field_path);
                anyhow::bail!("{}: {}", rule.field_path, rule.error_message);
            }
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    /// 加载配置：可选配置文件 + 环境变量，并执行校验
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix("HOSPITAL").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        ConfigValidator::new().validate(&config)?;
        info!(
            "Configuration loaded from: {}",
            config_path.unwrap_or("<environment>")
        );
        Ok(config)
    }
}
