//! HTML渲染
//!
//! 视图模型通过 handlebars 模板渲染，`{{}}` 插值会转义HTML特殊字符。
//! 模板随程序编译，运行时不依赖模板目录。

use handlebars::Handlebars;
use hospital_core::{HospitalError, Identity, Result};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::policy::Page;
use crate::state::{AppState, Notice};
use crate::views::{self, DialogBody, DialogView, NavItem, ProfileView};

const TEMPLATES: &[(&str, &str)] = &[
    ("layout", include_str!("../templates/layout.hbs")),
    ("login", include_str!("../templates/login.hbs")),
    ("dashboard", include_str!("../templates/dashboard.hbs")),
    ("patients", include_str!("../templates/patients.hbs")),
    ("diseases", include_str!("../templates/diseases.hbs")),
    ("doctors", include_str!("../templates/doctors.hbs")),
    ("registrations", include_str!("../templates/registrations.hbs")),
    ("reports", include_str!("../templates/reports.hbs")),
    ("dialog", include_str!("../templates/dialog.hbs")),
    ("dialog_patient", include_str!("../templates/dialog_patient.hbs")),
    ("dialog_disease", include_str!("../templates/dialog_disease.hbs")),
    ("dialog_doctor", include_str!("../templates/dialog_doctor.hbs")),
    ("dialog_account", include_str!("../templates/dialog_account.hbs")),
    ("dialog_registration", include_str!("../templates/dialog_registration.hbs")),
];

static HBS: Lazy<std::result::Result<Handlebars<'static>, String>> = Lazy::new(|| {
    let mut hbs = Handlebars::new();
    for (name, source) in TEMPLATES {
        hbs.register_template_string(name, *source)
            .map_err(|e| format!("template {}: {}", name, e))?;
    }
    Ok(hbs)
});

fn registry() -> Result<&'static Handlebars<'static>> {
    HBS.as_ref()
        .map_err(|e| HospitalError::Internal(e.clone()))
}

fn render<T: Serialize>(name: &str, data: &T) -> Result<String> {
    registry()?
        .render(name, data)
        .map_err(|e| HospitalError::Internal(format!("渲染 {} 失败: {}", name, e)))
}

#[derive(Serialize)]
struct LoginView<'a> {
    username: &'a str,
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct NoticeView<'a> {
    level: &'static str,
    message: &'a str,
}

#[derive(Serialize)]
struct DialogFrame<'a> {
    title: &'a str,
    body: String,
}

#[derive(Serialize)]
struct LayoutView<'a> {
    location: &'a str,
    page: &'static str,
    title: &'static str,
    authenticated: bool,
    profile: ProfileView,
    nav: Vec<NavItem>,
    content: String,
    dialog: Option<String>,
    notices: Vec<NoticeView<'a>>,
}

/// 渲染当前页面主体
pub fn render_page(state: &AppState, identity: Option<&Identity>) -> Result<String> {
    let role = identity.map(|i| i.role);
    match state.page {
        Page::Login => render(
            "login",
            &LoginView {
                username: identity.and_then(|i| i.username.as_deref()).unwrap_or(""),
                error: state.login_error.as_deref(),
            },
        ),
        Page::Dashboard => render(
            "dashboard",
            &views::dashboard_view(
                state.dashboard.summary.as_ref(),
                state.dashboard.error.as_deref(),
            ),
        ),
        Page::Patients => render(
            "patients",
            &views::patients_view(&state.patients, &state.filters, role),
        ),
        Page::Diseases => render(
            "diseases",
            &views::diseases_view(&state.diseases, &state.filters, role),
        ),
        Page::Doctors => render(
            "doctors",
            &views::doctors_view(&state.doctors, &state.diseases.items, role),
        ),
        Page::Registrations => render(
            "registrations",
            &views::registrations_view(
                &state.registrations,
                &state.patients.items,
                &state.doctors.items,
                &state.filters,
                identity,
            ),
        ),
        Page::Reports => render(
            "reports",
            &views::reports_view(state.reports.data.as_ref(), state.reports.error.as_deref()),
        ),
    }
}

/// 渲染对话框
pub fn render_dialog(dialog: &DialogView) -> Result<String> {
    let body = match &dialog.body {
        DialogBody::Patient(form) | DialogBody::MyProfile(form) => render("dialog_patient", form)?,
        DialogBody::Disease(form) => render("dialog_disease", form)?,
        DialogBody::Doctor(form) => render("dialog_doctor", form)?,
        DialogBody::AssignAccount(form) => render("dialog_account", form)?,
        DialogBody::Registration(form) => render("dialog_registration", form)?,
    };
    render(
        "dialog",
        &DialogFrame {
            title: dialog.title,
            body,
        },
    )
}

/// 渲染完整界面：侧边栏、页面、对话框与提示
pub fn render_screen(state: &AppState, identity: Option<&Identity>) -> Result<String> {
    let role = identity.map(|i| i.role);
    let content = render_page(state, identity)?;
    let dialog = match &state.dialog {
        Some(dialog) => Some(render_dialog(&views::dialog_view(
            dialog,
            &state.patients.items,
            &state.diseases.items,
            &state.doctors.items,
        ))?),
        None => None,
    };
    let notices = state
        .notices
        .iter()
        .map(|notice| NoticeView {
            level: match notice {
                Notice::Info(_) => "info",
                Notice::Error(_) => "error",
            },
            message: notice.message(),
        })
        .collect();

    render(
        "layout",
        &LayoutView {
            location: &state.location,
            page: state.page.id(),
            title: state.page.title(),
            authenticated: identity.is_some(),
            profile: views::profile(identity),
            nav: views::navigation(role, state.page),
            content,
            dialog,
            notices,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{RegistrationDraft, RegistrationMode};
    use crate::state::Dialog;
    use hospital_core::{Patient, Registration, Role};

    fn admin() -> Identity {
        Identity {
            id: "a1".to_string(),
            username: Some("admin".to_string()),
            role: Role::Admin,
            linked_id: None,
        }
    }

    #[test]
    fn test_templates_compile() {
        assert!(registry().is_ok());
    }

    #[test]
    fn test_patient_names_are_escaped() {
        let mut state = AppState::default();
        state.page = Page::Patients;
        state.patients.replace(vec![Patient {
            id: "p1".to_string(),
            name: "<script>alert(1)</script>".to_string(),
            ..Default::default()
        }]);

        let html = render_page(&state, Some(&admin())).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("新增病人"));
    }

    #[test]
    fn test_empty_and_error_states() {
        let mut state = AppState::default();
        state.page = Page::Doctors;
        let html = render_page(&state, Some(&admin())).unwrap();
        assert!(html.contains("暂无医生数据"));

        state.doctors.fail();
        let html = render_page(&state, Some(&admin())).unwrap();
        assert!(html.contains("加载数据失败，请刷新页面重试"));
    }

    #[test]
    fn test_registration_rows_without_permission() {
        let mut state = AppState::default();
        state.page = Page::Registrations;
        state.registrations.replace(vec![Registration {
            id: "r1".to_string(),
            ..Default::default()
        }]);
        let patient = Identity {
            role: Role::Patient,
            ..admin()
        };
        let html = render_page(&state, Some(&patient)).unwrap();
        assert!(html.contains("无权限"));
        assert!(!html.contains("btn-delete"));
    }

    #[test]
    fn test_screen_with_dialog_and_nav() {
        let mut state = AppState::default();
        state.page = Page::Registrations;
        state.location = Page::Registrations.hash();
        state.dialog = Some(Dialog::Registration {
            mode: RegistrationMode::DoctorEdit {
                original: Registration::default(),
            },
            draft: RegistrationDraft::default(),
        });
        state.alert("无权限");
        let doctor = Identity {
            role: Role::Doctor,
            ..admin()
        };

        let html = render_screen(&state, Some(&doctor)).unwrap();
        assert!(html.contains("编辑挂号"));
        assert!(html.contains("name=\"doctorId\" disabled"));
        assert!(html.contains("readonly"));
        assert!(html.contains("data-page=\"diseases\""));
        assert!(!html.contains("data-page=\"patients\""));
        assert!(html.contains("role=\"alert\""));
    }

    #[test]
    fn test_login_screen() {
        let mut state = AppState::default();
        state.login_error = Some("请输入账号和密码".to_string());
        let html = render_screen(&state, None).unwrap();
        assert!(html.contains("请输入账号和密码"));
        assert!(!html.contains("sidebar"));
    }
}
