//! # Hospital Core
//!
//! 医院挂号系统客户端的核心模块，提供实体模型、错误定义和通用校验工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{HospitalError, Result};
pub use models::*;
