//! 首页统计
//!
//! 汇总病人、医生、病种数量与今日挂号情况，并把病人注册与挂号
//! 两类事件合并为按时间倒序的最近动态。

use chrono::{DateTime, Local, Utc};
use hospital_core::utils::{format_local_date, is_same_local_day};
use hospital_core::{Doctor, IndexSnapshot, Patient, Registration, RegistrationStatus};
use serde::Serialize;
use std::collections::HashMap;

pub const UNKNOWN: &str = "未知";
pub const UNKNOWN_DEPARTMENT: &str = "未知科室";
pub const EMPTY_ACTIVITY: &str = "暂无最近活动";

/// 今日挂号按状态统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusSummary {
    pub fn count(&self, status: RegistrationStatus) -> usize {
        match status {
            RegistrationStatus::Pending => self.pending,
            RegistrationStatus::Confirmed => self.confirmed,
            RegistrationStatus::Completed => self.completed,
            RegistrationStatus::Cancelled => self.cancelled,
        }
    }

    fn add(&mut self, status: RegistrationStatus) {
        match status {
            RegistrationStatus::Pending => self.pending += 1,
            RegistrationStatus::Confirmed => self.confirmed += 1,
            RegistrationStatus::Completed => self.completed += 1,
            RegistrationStatus::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    NewPatient,
    NewRegistration,
}

impl ActivityKind {
    pub fn icon(&self) -> &'static str {
        match self {
            ActivityKind::NewPatient => "fas fa-user-plus",
            ActivityKind::NewRegistration => "fas fa-calendar-plus",
        }
    }
}

/// 一条动态
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub time: DateTime<Utc>,
    pub kind: ActivityKind,
    pub text: String,
}

/// 渲染用的动态条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityView {
    pub icon: String,
    pub text: String,
    pub time: String,
}

/// 首页数据
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub patient_count: usize,
    pub doctor_count: usize,
    pub disease_count: usize,
    pub today_registrations: usize,
    pub status: StatusSummary,
    pub activities: Vec<ActivityView>,
    /// 更新于 HH:MM
    pub updated_at: String,
}

/// 挂号是否发生在今天（本地日历日）
pub fn is_today(registration: &Registration, now: &DateTime<Local>) -> bool {
    registration
        .effective_time()
        .map(|t| is_same_local_day(&t, now))
        .unwrap_or(false)
}

pub fn status_summary<'a>(
    registrations: impl IntoIterator<Item = &'a Registration>,
) -> StatusSummary {
    let mut summary = StatusSummary::default();
    for registration in registrations {
        summary.add(registration.status);
    }
    summary
}

/// 相对时间：刚刚 / N分钟前 / N小时前 / N天前 / Y/M/D
pub fn relative_time(time: &DateTime<Utc>, now: &DateTime<Local>) -> String {
    let elapsed = now.with_timezone(&Utc).signed_duration_since(*time);
    let seconds = elapsed.num_seconds();

    if seconds < 30 {
        "刚刚".to_string()
    } else if seconds < 3600 {
        format!("{}分钟前", (seconds / 60).max(1))
    } else if seconds < 24 * 3600 {
        format!("{}小时前", (seconds / 3600).max(1))
    } else if seconds < 7 * 24 * 3600 {
        format!("{}天前", (seconds / (24 * 3600)).max(1))
    } else {
        format_local_date(time)
    }
}

/// 合并病人注册与挂号事件，按时间倒序取前 `limit` 条；时间相同保持原有顺序
pub fn merge_activity_feed(
    patients: &[Patient],
    doctors: &[Doctor],
    registrations: &[Registration],
    limit: usize,
) -> Vec<Activity> {
    let patient_names: HashMap<&str, &str> = patients
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();
    let doctor_by_id: HashMap<&str, &Doctor> =
        doctors.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut items = Vec::new();

    for patient in patients {
        let Some(time) = patient.activity_time() else {
            continue;
        };
        let name = if patient.name.is_empty() { UNKNOWN } else { patient.name.as_str() };
        items.push(Activity {
            time,
            kind: ActivityKind::NewPatient,
            text: format!("新病人 {} 已注册", name),
        });
    }

    for registration in registrations {
        let Some(time) = registration.effective_time() else {
            continue;
        };
        let patient_name = patient_names
            .get(registration.patient_id.as_str())
            .copied()
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN);
        let doctor = doctor_by_id.get(registration.doctor_id.as_str());
        let doctor_name = doctor
            .map(|d| d.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN);

        let departments = registration.effective_departments();
        let department_text = if !departments.is_empty() {
            departments
                .iter()
                .map(|d| d.label())
                .collect::<Vec<_>>()
                .join("、")
        } else {
            doctor
                .map(|d| d.department.label().to_string())
                .unwrap_or_else(|| UNKNOWN_DEPARTMENT.to_string())
        };

        items.push(Activity {
            time,
            kind: ActivityKind::NewRegistration,
            text: format!(
                "病人 {} 预约了 {}（{}）",
                patient_name, department_text, doctor_name
            ),
        });
    }

    // sort_by 为稳定排序
    items.sort_by(|a, b| b.time.cmp(&a.time));
    items.truncate(limit);
    items
}

/// 计算首页数据
pub fn summarize(
    snapshot: &IndexSnapshot,
    disease_count: usize,
    now: &DateTime<Local>,
    activity_limit: usize,
) -> DashboardSummary {
    let todays: Vec<&Registration> = snapshot
        .registrations
        .iter()
        .filter(|r| is_today(r, now))
        .collect();

    let activities = merge_activity_feed(
        &snapshot.patients,
        &snapshot.doctors,
        &snapshot.registrations,
        activity_limit,
    )
    .into_iter()
    .map(|a| ActivityView {
        icon: a.kind.icon().to_string(),
        time: relative_time(&a.time, now),
        text: a.text,
    })
    .collect();

    DashboardSummary {
        patient_count: snapshot.patients.len(),
        doctor_count: snapshot.doctors.len(),
        disease_count,
        today_registrations: todays.len(),
        status: status_summary(todays.iter().copied()),
        activities,
        updated_at: format!("更新于 {}", now.format("%H:%M")),
    }
}
