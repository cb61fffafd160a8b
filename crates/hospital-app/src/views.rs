//! 视图模型
//!
//! 把缓存数据与角色权限投影为页面可直接渲染的结构。权限在这里
//! 决定按钮是否出现，点击时 [`crate::App`] 还会再检查一次。

use chrono::{DateTime, Local, Utc};
use hospital_core::utils::format_local_date;
use hospital_core::{
    Department, Disease, Doctor, Identity, Patient, Registration, RegistrationStatus, Role,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::dashboard::{DashboardSummary, EMPTY_ACTIVITY, UNKNOWN};
use crate::forms::{
    AccountDraft, DiseaseDraft, DoctorDraft, PatientDraft, RegistrationDraft, RegistrationMode,
};
use crate::policy::{self, Action, Page};
use crate::reports::ReportData;
use crate::state::{Cache, Dialog, Filters, GenderFilter};

pub const EMPTY_PATIENTS: &str = "暂无病人数据";
pub const EMPTY_DISEASES: &str = "暂无病种数据";
pub const EMPTY_DOCTORS: &str = "暂无医生数据";
pub const EMPTY_REGISTRATIONS: &str = "暂无挂号数据";
pub const NO_PERMISSION: &str = "无权限";
pub const SELF_LABEL: &str = "本人";

// ---------------------------------------------------------------------------
// 导航与账号信息
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub id: &'static str,
    pub title: &'static str,
    pub href: String,
    pub active: bool,
}

/// 侧边栏导航：只列出允许访问的页面
pub fn navigation(role: Option<Role>, current: Page) -> Vec<NavItem> {
    policy::allowed_pages(role)
        .iter()
        .map(|page| NavItem {
            id: page.id(),
            title: page.title(),
            href: page.hash(),
            active: *page == current,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub name: String,
    pub role: String,
}

pub fn profile(identity: Option<&Identity>) -> ProfileView {
    match identity {
        Some(identity) => ProfileView {
            name: identity.display_name().to_string(),
            role: identity.role.label().to_string(),
        },
        None => ProfileView {
            name: "未登录".to_string(),
            role: "请先登录".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// 行内操作
// ---------------------------------------------------------------------------

/// 行/卡片的操作区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowActions {
    pub edit: bool,
    pub delete: bool,
    pub assign: bool,
}

impl RowActions {
    fn new(role: Option<Role>, edit: Action, delete: Action) -> Self {
        Self {
            edit: policy::permits(role, edit),
            delete: policy::permits(role, delete),
            assign: false,
        }
    }

    pub fn any(&self) -> bool {
        self.edit || self.delete || self.assign
    }
}

// ---------------------------------------------------------------------------
// 病人
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientRow {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub age: i64,
    pub phone: String,
    pub id_card: String,
    pub address: String,
    pub actions: RowActions,
    pub has_actions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientsView {
    pub can_create: bool,
    pub rows: Vec<PatientRow>,
    pub empty: Option<&'static str>,
    pub error: Option<String>,
    pub query: String,
    pub gender: &'static str,
}

/// 按姓名、电话、身份证号、地址搜索（不区分大小写），再按性别筛选
pub fn filter_patients<'a>(
    patients: &'a [Patient],
    query: &str,
    gender: GenderFilter,
) -> Vec<&'a Patient> {
    let query = query.trim().to_lowercase();
    patients
        .iter()
        .filter(|p| gender.matches(p.gender()))
        .filter(|p| {
            if query.is_empty() {
                return true;
            }
            let haystack = format!("{} {} {} {}", p.name, p.phone, p.id_card, p.address);
            haystack.to_lowercase().contains(&query)
        })
        .collect()
}

pub fn patients_view(
    cache: &Cache<Patient>,
    filters: &Filters,
    role: Option<Role>,
) -> PatientsView {
    let actions = RowActions::new(role, Action::EditPatient, Action::DeletePatient);
    let rows: Vec<PatientRow> =
        filter_patients(&cache.items, &filters.patient_query, filters.patient_gender)
            .into_iter()
            .map(|p| PatientRow {
                id: p.id.clone(),
                name: p.name.clone(),
                gender: p.gender_text.clone(),
                age: p.age,
                phone: p.phone.clone(),
                id_card: p.id_card.clone(),
                address: p.address.clone(),
                actions,
                has_actions: actions.any(),
            })
            .collect();

    PatientsView {
        can_create: policy::permits(role, Action::CreatePatient),
        empty: rows.is_empty().then_some(EMPTY_PATIENTS),
        rows,
        error: cache.error.clone(),
        query: filters.patient_query.clone(),
        gender: match filters.patient_gender {
            GenderFilter::All => "all",
            GenderFilter::Male => "male",
            GenderFilter::Female => "female",
        },
    }
}

// ---------------------------------------------------------------------------
// 病种
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiseaseCard {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub symptoms: String,
    pub treatment: String,
    pub actions: RowActions,
    pub has_actions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiseasesView {
    pub can_create: bool,
    pub cards: Vec<DiseaseCard>,
    pub empty: Option<&'static str>,
    pub error: Option<String>,
}

pub fn filter_diseases<'a>(
    diseases: &'a [Disease],
    category: Option<Department>,
) -> Vec<&'a Disease> {
    diseases
        .iter()
        .filter(|d| category.map(|c| d.category == c).unwrap_or(true))
        .collect()
}

pub fn diseases_view(
    cache: &Cache<Disease>,
    filters: &Filters,
    role: Option<Role>,
) -> DiseasesView {
    let actions = RowActions::new(role, Action::EditDisease, Action::DeleteDisease);
    let cards: Vec<DiseaseCard> = filter_diseases(&cache.items, filters.disease_category)
        .into_iter()
        .map(|d| DiseaseCard {
            id: d.id.clone(),
            name: d.name.clone(),
            category: d.category.label().to_string(),
            description: d.description.clone(),
            symptoms: d.symptoms.clone(),
            treatment: d.treatment.clone(),
            actions,
            has_actions: actions.any(),
        })
        .collect();

    DiseasesView {
        can_create: policy::permits(role, Action::CreateDisease),
        empty: cards.is_empty().then_some(EMPTY_DISEASES),
        cards,
        error: cache.error.clone(),
    }
}

// ---------------------------------------------------------------------------
// 医生
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorCard {
    pub id: String,
    pub name: String,
    pub photo: Option<String>,
    /// 科室 · 职称
    pub subtitle: String,
    pub introduction: String,
    /// 出诊日，以"、"连接
    pub work_days: String,
    pub max_patients: i64,
    /// ¥x.xx
    pub fee: String,
    pub disease_tags: Vec<String>,
    pub actions: RowActions,
    pub has_actions: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorsView {
    pub can_create: bool,
    pub cards: Vec<DoctorCard>,
    pub empty: Option<&'static str>,
    pub error: Option<String>,
}

pub fn format_fee(fee: f64) -> String {
    format!("¥{:.2}", fee)
}

pub fn doctors_view(
    doctors: &Cache<Doctor>,
    diseases: &[Disease],
    role: Option<Role>,
) -> DoctorsView {
    let disease_names: HashMap<&str, &str> = diseases
        .iter()
        .map(|d| (d.id.as_str(), d.name.as_str()))
        .collect();
    let mut actions = RowActions::new(role, Action::EditDoctor, Action::DeleteDoctor);
    actions.assign = policy::permits(role, Action::AssignDoctorAccount);

    let cards: Vec<DoctorCard> = doctors
        .items
        .iter()
        .map(|d| DoctorCard {
            id: d.id.clone(),
            name: d.name.clone(),
            photo: d.photo.clone(),
            subtitle: format!("{} · {}", d.department.label(), d.title),
            introduction: d.introduction.clone(),
            work_days: d.available_days().join("、"),
            max_patients: d.max_patients,
            fee: format_fee(d.fee),
            disease_tags: d
                .diseases
                .iter()
                .map(|id| {
                    disease_names
                        .get(id.as_str())
                        .map(|name| name.to_string())
                        .unwrap_or_else(|| id.clone())
                })
                .collect(),
            actions,
            has_actions: actions.any(),
        })
        .collect();

    DoctorsView {
        can_create: policy::permits(role, Action::CreateDoctor),
        empty: cards.is_empty().then_some(EMPTY_DOCTORS),
        cards,
        error: doctors.error.clone(),
    }
}

// ---------------------------------------------------------------------------
// 挂号
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRow {
    pub id: String,
    pub patient: String,
    pub doctor: String,
    pub departments: String,
    /// 就诊日期 + 时间段
    pub visit: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub actions: RowActions,
    pub has_actions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationsView {
    pub can_create: bool,
    pub rows: Vec<RegistrationRow>,
    pub empty: Option<&'static str>,
    pub error: Option<String>,
    pub status: &'static str,
    pub date: String,
}

/// 按状态与就诊日期（本地日历日）筛选
pub fn filter_registrations<'a>(
    registrations: &'a [Registration],
    filters: &Filters,
) -> Vec<&'a Registration> {
    registrations
        .iter()
        .filter(|r| filters.registration_status.map(|s| r.status == s).unwrap_or(true))
        .filter(|r| match filters.registration_date {
            None => true,
            Some(date) => r
                .visit_date
                .map(|v| v.with_timezone(&Local).date_naive() == date)
                .unwrap_or(false),
        })
        .collect()
}

fn format_visit(visit_date: Option<DateTime<Utc>>, time_slot: &str) -> String {
    let date = visit_date.as_ref().map(format_local_date).unwrap_or_default();
    format!("{} {}", date, time_slot).trim().to_string()
}

pub fn registrations_view(
    registrations: &Cache<Registration>,
    patients: &[Patient],
    doctors: &[Doctor],
    filters: &Filters,
    identity: Option<&Identity>,
) -> RegistrationsView {
    let role = identity.map(|i| i.role);
    let mut patient_names: HashMap<&str, &str> = patients
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();
    if let Some(linked) = identity
        .filter(|i| i.role == Role::Patient)
        .and_then(|i| i.linked_id.as_deref())
    {
        patient_names.insert(linked, SELF_LABEL);
    }
    let doctor_names: HashMap<&str, &str> = doctors
        .iter()
        .map(|d| (d.id.as_str(), d.name.as_str()))
        .collect();

    let actions = RowActions::new(role, Action::EditRegistration, Action::DeleteRegistration);
    let rows: Vec<RegistrationRow> = filter_registrations(&registrations.items, filters)
        .into_iter()
        .map(|r| RegistrationRow {
            id: r.id.clone(),
            patient: patient_names
                .get(r.patient_id.as_str())
                .map(|n| n.to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            doctor: doctor_names
                .get(r.doctor_id.as_str())
                .map(|n| n.to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            departments: r
                .effective_departments()
                .iter()
                .map(|d| d.label())
                .collect::<Vec<_>>()
                .join("、"),
            visit: format_visit(r.visit_date, &r.time_slot),
            status: r.status.as_str(),
            status_label: r.status.label(),
            actions,
            has_actions: actions.any(),
        })
        .collect();

    RegistrationsView {
        can_create: policy::permits(role, Action::CreateRegistration),
        empty: rows.is_empty().then_some(EMPTY_REGISTRATIONS),
        rows,
        error: registrations.error.clone(),
        status: filters
            .registration_status
            .map(|s| s.as_str())
            .unwrap_or("all"),
        date: filters
            .registration_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// 首页与报表
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatView {
    pub label: &'static str,
    pub status: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub patient_count: usize,
    pub doctor_count: usize,
    pub disease_count: usize,
    pub today_registrations: usize,
    pub statuses: Vec<StatView>,
    pub activities: Vec<crate::dashboard::ActivityView>,
    pub empty_activity: Option<&'static str>,
    pub updated_at: String,
    pub error: Option<String>,
}

pub fn dashboard_view(summary: Option<&DashboardSummary>, error: Option<&str>) -> DashboardView {
    let summary = summary.cloned();
    let statuses = RegistrationStatus::ALL
        .iter()
        .map(|status| StatView {
            label: status.label(),
            status: status.as_str(),
            count: summary.as_ref().map(|s| s.status.count(*status)).unwrap_or(0),
        })
        .collect();

    match summary {
        Some(s) => DashboardView {
            patient_count: s.patient_count,
            doctor_count: s.doctor_count,
            disease_count: s.disease_count,
            today_registrations: s.today_registrations,
            statuses,
            empty_activity: s.activities.is_empty().then_some(EMPTY_ACTIVITY),
            activities: s.activities,
            updated_at: s.updated_at,
            error: error.map(str::to_string),
        },
        None => DashboardView {
            patient_count: 0,
            doctor_count: 0,
            disease_count: 0,
            today_registrations: 0,
            statuses,
            activities: Vec::new(),
            empty_activity: Some(EMPTY_ACTIVITY),
            updated_at: String::new(),
            error: error.map(str::to_string),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub title: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportsView {
    pub charts: Vec<ChartView>,
    pub error: Option<String>,
}

pub fn reports_view(data: Option<&ReportData>, error: Option<&str>) -> ReportsView {
    let charts = data
        .map(|d| {
            [&d.weekly, &d.departments]
                .into_iter()
                .map(|series| ChartView {
                    title: series.title.clone(),
                    points: series
                        .points()
                        .map(|(label, value)| ChartPoint {
                            label: label.to_string(),
                            value,
                        })
                        .collect(),
                })
                .collect()
        })
        .unwrap_or_default();
    ReportsView {
        charts,
        error: error.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// 对话框
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckView {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

fn department_options(selected: &str, choices: &[Department]) -> Vec<OptionView> {
    choices
        .iter()
        .map(|d| OptionView {
            value: d.label().to_string(),
            label: d.label().to_string(),
            selected: d.label() == selected.trim(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientFormView {
    pub draft: PatientFields,
    pub genders: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientFields {
    pub name: String,
    pub age: String,
    pub phone: String,
    pub id_card: String,
    pub address: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
}

fn patient_form(draft: &PatientDraft) -> PatientFormView {
    PatientFormView {
        draft: PatientFields {
            name: draft.name.clone(),
            age: draft.age.clone(),
            phone: draft.phone.clone(),
            id_card: draft.id_card.clone(),
            address: draft.address.clone(),
            emergency_contact: draft.emergency_contact.clone(),
            emergency_phone: draft.emergency_phone.clone(),
        },
        genders: ["男", "女"]
            .iter()
            .map(|g| OptionView {
                value: g.to_string(),
                label: g.to_string(),
                selected: draft.gender.trim() == *g,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiseaseFormView {
    pub name: String,
    pub categories: Vec<OptionView>,
    pub description: String,
    pub symptoms: String,
    pub treatment: String,
}

fn disease_form(draft: &DiseaseDraft) -> DiseaseFormView {
    DiseaseFormView {
        name: draft.name.clone(),
        categories: department_options(&draft.category, Department::disease_categories()),
        description: draft.description.clone(),
        symptoms: draft.symptoms.clone(),
        treatment: draft.treatment.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorFormView {
    pub name: String,
    pub departments: Vec<OptionView>,
    pub title: String,
    pub max_patients: String,
    pub fee: String,
    pub introduction: String,
    pub diseases: Vec<CheckView>,
}

fn doctor_form(draft: &DoctorDraft, diseases: &[Disease]) -> DoctorFormView {
    DoctorFormView {
        name: draft.name.clone(),
        departments: department_options(&draft.department, Department::disease_categories()),
        title: draft.title.clone(),
        max_patients: draft.max_patients.clone(),
        fee: draft.fee.clone(),
        introduction: draft.introduction.clone(),
        diseases: diseases
            .iter()
            .map(|d| CheckView {
                value: d.id.clone(),
                label: d.name.clone(),
                checked: draft.diseases.contains(&d.id),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountFormView {
    pub doctor_name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationFormView {
    /// 病人为本人挂号时显示"本人"而不是下拉框
    pub patient_is_self: bool,
    pub patients: Vec<OptionView>,
    pub doctors: Vec<OptionView>,
    pub departments: Vec<CheckView>,
    pub visit_date: String,
    pub time_slot: String,
    pub symptoms: String,
    pub notes: String,
    /// 状态下拉框，仅有编辑权限的角色可见
    pub statuses: Option<Vec<OptionView>>,
    /// 病人、医生、日期、时间段、科室控件禁用
    pub facts_disabled: bool,
    pub symptoms_readonly: bool,
}

fn registration_form(
    mode: &RegistrationMode,
    draft: &RegistrationDraft,
    patients: &[Patient],
    doctors: &[Doctor],
) -> RegistrationFormView {
    let locked = mode.locks_facts();
    RegistrationFormView {
        patient_is_self: matches!(mode, RegistrationMode::PatientCreate { .. }),
        patients: patients
            .iter()
            .map(|p| OptionView {
                value: p.id.clone(),
                label: p.name.clone(),
                selected: p.id == draft.patient_id,
            })
            .collect(),
        doctors: doctors
            .iter()
            .map(|d| OptionView {
                value: d.id.clone(),
                label: format!("{}（{}）", d.name, d.department.label()),
                selected: d.id == draft.doctor_id,
            })
            .collect(),
        departments: Department::ALL
            .iter()
            .map(|d| CheckView {
                value: d.label().to_string(),
                label: d.label().to_string(),
                checked: draft.departments.contains(d),
            })
            .collect(),
        visit_date: draft.visit_date.clone(),
        time_slot: draft.time_slot.clone(),
        symptoms: draft.symptoms.clone(),
        notes: draft.notes.clone(),
        statuses: draft.status.map(|current| {
            RegistrationStatus::ALL
                .iter()
                .map(|s| OptionView {
                    value: s.as_str().to_string(),
                    label: s.label().to_string(),
                    selected: *s == current,
                })
                .collect()
        }),
        facts_disabled: locked,
        symptoms_readonly: locked,
    }
}

/// 对话框内容
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DialogBody {
    Patient(PatientFormView),
    Disease(DiseaseFormView),
    Doctor(DoctorFormView),
    AssignAccount(AccountFormView),
    MyProfile(PatientFormView),
    Registration(RegistrationFormView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogView {
    pub title: &'static str,
    pub body: DialogBody,
}

pub fn dialog_view(
    dialog: &Dialog,
    patients: &[Patient],
    diseases: &[Disease],
    doctors: &[Doctor],
) -> DialogView {
    let body = match dialog {
        Dialog::Patient { draft, .. } => DialogBody::Patient(patient_form(draft)),
        Dialog::Disease { draft, .. } => DialogBody::Disease(disease_form(draft)),
        Dialog::Doctor { draft, .. } => DialogBody::Doctor(doctor_form(draft, diseases)),
        Dialog::AssignAccount {
            doctor_name,
            draft: AccountDraft { username, .. },
            ..
        } => DialogBody::AssignAccount(AccountFormView {
            doctor_name: doctor_name.clone(),
            username: username.clone(),
        }),
        Dialog::MyProfile { draft } => DialogBody::MyProfile(patient_form(draft)),
        Dialog::Registration { mode, draft } => {
            DialogBody::Registration(registration_form(mode, draft, patients, doctors))
        }
    };
    DialogView {
        title: dialog.title(),
        body,
    }
}
