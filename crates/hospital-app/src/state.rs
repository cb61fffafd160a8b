//! 应用状态
//!
//! 当前页面、各实体缓存、筛选条件、打开的对话框与待展示的提示
//! 都集中在 [`AppState`] 中，由 [`crate::App`] 独占并修改。

use chrono::NaiveDate;
use hospital_core::{Department, Disease, Doctor, Gender, Patient, Registration, RegistrationStatus};

use crate::dashboard::DashboardSummary;
use crate::forms::{
    AccountDraft, DiseaseDraft, DoctorDraft, PatientDraft, RegistrationDraft, RegistrationMode,
};
use crate::policy::Page;
use crate::reports::ReportData;

pub const MSG_LOAD_FAILED: &str = "加载数据失败，请刷新页面重试";

/// 单个实体集合的缓存
///
/// 只有加载成功才替换 `items`；失败时保留旧数据并记录 `error`。
#[derive(Debug, Clone)]
pub struct Cache<T> {
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
        }
    }
}

impl<T> Cache<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.error = None;
    }

    pub fn fail(&mut self) {
        self.error = Some(MSG_LOAD_FAILED.to_string());
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.error = None;
    }
}

/// 性别筛选
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenderFilter {
    #[default]
    All,
    Male,
    Female,
}

impl GenderFilter {
    pub fn parse(value: &str) -> GenderFilter {
        match value.trim() {
            "male" => GenderFilter::Male,
            "female" => GenderFilter::Female,
            _ => GenderFilter::All,
        }
    }

    pub fn matches(&self, gender: Option<Gender>) -> bool {
        match self {
            GenderFilter::All => true,
            GenderFilter::Male => gender == Some(Gender::Male),
            GenderFilter::Female => gender == Some(Gender::Female),
        }
    }
}

/// 列表筛选条件，只作用于本地缓存
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub patient_query: String,
    pub patient_gender: GenderFilter,
    pub disease_category: Option<Department>,
    pub registration_status: Option<RegistrationStatus>,
    pub registration_date: Option<NaiveDate>,
}

/// 打开的对话框
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    Patient {
        editing: Option<String>,
        draft: PatientDraft,
    },
    Disease {
        editing: Option<String>,
        draft: DiseaseDraft,
    },
    Doctor {
        editing: Option<String>,
        draft: DoctorDraft,
    },
    AssignAccount {
        doctor_id: String,
        doctor_name: String,
        draft: AccountDraft,
    },
    /// 病人完善本人档案，保存后继续打开挂号对话框
    MyProfile { draft: PatientDraft },
    Registration {
        mode: RegistrationMode,
        draft: RegistrationDraft,
    },
}

impl Dialog {
    pub fn title(&self) -> &'static str {
        match self {
            Dialog::Patient { editing: None, .. } => "新增病人",
            Dialog::Patient { .. } => "编辑病人",
            Dialog::Disease { editing: None, .. } => "新增病种",
            Dialog::Disease { .. } => "编辑病种",
            Dialog::Doctor { editing: None, .. } => "新增医生",
            Dialog::Doctor { .. } => "编辑医生",
            Dialog::AssignAccount { .. } => "分配账号",
            Dialog::MyProfile { .. } => "完善个人信息",
            Dialog::Registration { mode, .. } => mode.title(),
        }
    }
}

/// 阻塞式提示（对应浏览器 alert）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(message) | Notice::Error(message) => message,
        }
    }
}

/// 首页状态
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub summary: Option<DashboardSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportsState {
    pub data: Option<ReportData>,
    pub error: Option<String>,
}

/// 应用全部状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub page: Page,
    /// 地址栏位置，如 `#patients`
    pub location: String,
    pub patients: Cache<Patient>,
    pub diseases: Cache<Disease>,
    pub doctors: Cache<Doctor>,
    pub registrations: Cache<Registration>,
    pub filters: Filters,
    pub dialog: Option<Dialog>,
    pub notices: Vec<Notice>,
    pub login_error: Option<String>,
    pub dashboard: DashboardState,
    pub reports: ReportsState,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            page: Page::Login,
            location: Page::Login.hash(),
            patients: Cache::default(),
            diseases: Cache::default(),
            doctors: Cache::default(),
            registrations: Cache::default(),
            filters: Filters::default(),
            dialog: None,
            notices: Vec::new(),
            login_error: None,
            dashboard: DashboardState::default(),
            reports: ReportsState::default(),
        }
    }
}

impl AppState {
    pub fn alert(&mut self, message: impl Into<String>) {
        self.notices.push(Notice::Error(message.into()));
    }

    pub fn inform(&mut self, message: impl Into<String>) {
        self.notices.push(Notice::Info(message.into()));
    }

    /// 取出全部待展示提示
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
    }

    /// 退出登录后清空所有缓存数据
    pub fn reset_data(&mut self) {
        self.patients.clear();
        self.diseases.clear();
        self.doctors.clear();
        self.registrations.clear();
        self.filters = Filters::default();
        self.dialog = None;
        self.dashboard = DashboardState::default();
        self.reports = ReportsState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_failure_keeps_items() {
        let mut cache = Cache::default();
        cache.replace(vec![1, 2, 3]);
        cache.fail();
        assert_eq!(cache.items, vec![1, 2, 3]);
        assert_eq!(cache.error.as_deref(), Some(MSG_LOAD_FAILED));
        cache.replace(vec![4]);
        assert!(cache.error.is_none());
    }

    #[test]
    fn test_gender_filter() {
        assert!(GenderFilter::parse("all").matches(None));
        assert!(GenderFilter::parse("male").matches(Some(Gender::Male)));
        assert!(!GenderFilter::parse("female").matches(Some(Gender::Male)));
        assert!(!GenderFilter::Female.matches(None));
    }

    #[test]
    fn test_dialog_titles() {
        let dialog = Dialog::Patient {
            editing: Some("p1".to_string()),
            draft: PatientDraft::default(),
        };
        assert_eq!(dialog.title(), "编辑病人");
        let dialog = Dialog::Registration {
            mode: RegistrationMode::PatientCreate {
                linked_patient_id: "p1".to_string(),
            },
            draft: RegistrationDraft::default(),
        };
        assert_eq!(dialog.title(), "提交病症");
    }

    #[test]
    fn test_take_notices_drains() {
        let mut state = AppState::default();
        state.alert("无权限");
        state.inform("分配成功");
        assert_eq!(state.take_notices().len(), 2);
        assert!(state.notices.is_empty());
    }
}
