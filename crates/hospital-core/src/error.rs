//! 错误定义模块

use thiserror::Error;

/// 挂号系统统一错误类型
#[derive(Error, Debug)]
pub enum HospitalError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("网络错误: {0}")]
    Network(String),

    /// 后端返回非2xx状态，`message` 为从响应体中提取的可读信息
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 表单校验失败，消息直接展示给用户
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Permission(String),

    #[error("{0}")]
    NotFound(String),

    #[error("未登录")]
    Unauthenticated,

    #[error("操作已取消")]
    Cancelled,

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl HospitalError {
    /// 无权限错误，与界面提示文案一致
    pub fn no_permission() -> Self {
        HospitalError::Permission("无权限".to_string())
    }

    /// 后端响应状态码（仅 `Api` 变体有值）
    pub fn status(&self) -> Option<u16> {
        match self {
            HospitalError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 挂号系统统一结果类型
pub type Result<T> = std::result::Result<T, HospitalError>;
