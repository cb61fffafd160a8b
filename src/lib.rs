//! 医院挂号系统客户端
//!
//! 汇总各子模块，供演示程序使用。

pub use hospital_app as app;
pub use hospital_client as client;
pub use hospital_core as core;
