//! 角色权限表
//!
//! 纯函数，无状态：角色 → 可访问页面、可执行操作。

use hospital_core::Role;
use std::fmt;

/// 页面标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Login,
    Dashboard,
    Patients,
    Diseases,
    Doctors,
    Registrations,
    Reports,
}

impl Page {
    /// 导航栏顺序
    pub const NAVIGABLE: [Page; 6] = [
        Page::Dashboard,
        Page::Patients,
        Page::Diseases,
        Page::Doctors,
        Page::Registrations,
        Page::Reports,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Page::Login => "login",
            Page::Dashboard => "dashboard",
            Page::Patients => "patients",
            Page::Diseases => "diseases",
            Page::Doctors => "doctors",
            Page::Registrations => "registrations",
            Page::Reports => "reports",
        }
    }

    pub fn parse(id: &str) -> Option<Page> {
        match id.trim() {
            "login" => Some(Page::Login),
            "dashboard" => Some(Page::Dashboard),
            "patients" => Some(Page::Patients),
            "diseases" => Some(Page::Diseases),
            "doctors" => Some(Page::Doctors),
            "registrations" => Some(Page::Registrations),
            "reports" => Some(Page::Reports),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Login => "登录",
            Page::Dashboard => "首页",
            Page::Patients => "病人管理",
            Page::Diseases => "病种管理",
            Page::Doctors => "医生管理",
            Page::Registrations => "挂号管理",
            Page::Reports => "统计报表",
        }
    }

    /// 地址栏中的位置，如 `#patients`
    pub fn hash(&self) -> String {
        format!("#{}", self.id())
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// 需要权限的修改操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreatePatient,
    EditPatient,
    DeletePatient,
    CreateDisease,
    EditDisease,
    DeleteDisease,
    CreateDoctor,
    EditDoctor,
    DeleteDoctor,
    AssignDoctorAccount,
    CreateRegistration,
    EditRegistration,
    DeleteRegistration,
}

/// 角色可访问的页面；未登录时为空
pub fn allowed_pages(role: Option<Role>) -> &'static [Page] {
    match role {
        Some(Role::Admin) => &Page::NAVIGABLE,
        Some(Role::Doctor) => &[Page::Diseases, Page::Registrations],
        Some(Role::Patient) => &[Page::Registrations],
        None => &[],
    }
}

pub fn can_access(role: Option<Role>, page: Page) -> bool {
    allowed_pages(role).contains(&page)
}

/// 默认落地页：第一个允许的页面，没有则为登录页
pub fn default_page(role: Option<Role>) -> Page {
    allowed_pages(role).first().copied().unwrap_or(Page::Login)
}

pub fn permits(role: Option<Role>, action: Action) -> bool {
    use Action::*;
    match role {
        Some(Role::Admin) => true,
        Some(Role::Doctor) => matches!(action, CreateDisease | EditDisease | EditRegistration),
        Some(Role::Patient) => matches!(action, CreateRegistration),
        None => false,
    }
}
