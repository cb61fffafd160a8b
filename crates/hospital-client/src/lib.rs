//! # Hospital Client
//!
//! 挂号系统后端的访问层：
//! - 传输抽象与基于 reqwest 的HTTP实现
//! - 认证、实体增删改查与首页概览的类型化调用
//! - 登录令牌持久化

pub mod client;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod token_store;
pub mod transport;

pub use client::{extract_error_message, ApiClient, AssignAccountRequest, Resource};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, DEFAULT_TOKEN_KEY};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, Transport};
