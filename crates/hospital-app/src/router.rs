//! 路由解析
//!
//! 把导航位置（`#patients`）解析为实际页面，并按角色权限重定向。

use hospital_core::Role;

use crate::policy::{self, Page};

/// 解析地址栏位置；空位置或未知页面返回 `None`
pub fn parse_location(location: &str) -> Option<Page> {
    let id = location.trim().trim_start_matches('#');
    Page::parse(id)
}

/// 计算实际进入的页面
///
/// - 未登录时只能进入登录页
/// - 已登录访问登录页跳转到默认页
/// - 不在允许范围内（含未知页面）跳转到默认页
pub fn resolve(requested: Option<Page>, role: Option<Role>) -> Page {
    match (role, requested) {
        (None, _) => Page::Login,
        (Some(_), Some(Page::Login)) | (Some(_), None) => policy::default_page(role),
        (Some(_), Some(page)) if policy::can_access(role, page) => page,
        (Some(_), Some(_)) => policy::default_page(role),
    }
}

/// 解析位置字符串并计算实际页面
pub fn resolve_location(location: &str, role: Option<Role>) -> Page {
    resolve(parse_location(location), role)
}
