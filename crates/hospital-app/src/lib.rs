//! # 挂号系统前端逻辑
//!
//! 不依赖具体界面的客户端应用层：
//! - 会话：登录、令牌恢复、退出
//! - 路由：按角色计算可访问页面并重定向
//! - 数据：各页面的列表加载、表单校验、增删改
//! - 统计：首页概览与统计报表
//! - 渲染：把状态渲染为HTML

pub mod app;
pub mod config;
pub mod dashboard;
pub mod forms;
pub mod loaders;
pub mod policy;
pub mod render;
pub mod reports;
pub mod router;
pub mod session;
pub mod state;
pub mod views;

// 重新导出主要类型
pub use app::App;
pub use config::AppConfig;
pub use loaders::{AutoConfirm, Prompt};
pub use policy::{Action, Page};
pub use session::SessionStore;
pub use state::{AppState, Dialog, GenderFilter, Notice};
