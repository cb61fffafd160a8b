//! 统计报表
//!
//! 本周每日挂号数量与本月科室挂号分布。

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use hospital_core::{Department, Doctor, IndexSnapshot, Registration};
use std::collections::HashMap;

use crate::forms::local_midnight;

pub const WEEKLY_TITLE: &str = "本周挂号数量统计";
pub const DEPARTMENT_TITLE: &str = "本月科室挂号分布";
pub const WEEKDAY_LABELS: [&str; 7] = ["周一", "周二", "周三", "周四", "周五", "周六", "周日"];

const TOP_DEPARTMENTS: usize = 5;
const OTHER_LABEL: &str = "其他";
const UNKNOWN_LABEL: &str = "未知";

/// 一组图表数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub title: String,
    pub labels: Vec<String>,
    pub data: Vec<usize>,
}

impl Series {
    /// 标签与数值成对迭代
    pub fn points(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.data.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportData {
    pub weekly: Series,
    pub departments: Series,
}

/// 本周周一（本地日期）
pub fn week_start(now: &DateTime<Local>) -> NaiveDate {
    let today = now.date_naive();
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

/// 本周一至周日每天的挂号数量
pub fn weekly_trend(registrations: &[Registration], now: &DateTime<Local>) -> Series {
    let monday = week_start(now);
    let mut data = vec![0usize; 7];

    for time in registrations.iter().filter_map(Registration::effective_time) {
        let day = time.with_timezone(&Local).date_naive();
        let offset = (day - monday).num_days();
        if (0..7).contains(&offset) {
            data[offset as usize] += 1;
        }
    }

    Series {
        title: WEEKLY_TITLE.to_string(),
        labels: WEEKDAY_LABELS.iter().map(|l| l.to_string()).collect(),
        data,
    }
}

/// 本月第一天零点
fn month_start(now: &DateTime<Local>) -> Option<DateTime<Utc>> {
    let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
    local_midnight(first)
}

/// 本月科室分布：取前5个科室，其余合并为"其他"
pub fn department_distribution(
    registrations: &[Registration],
    doctors: &[Doctor],
    now: &DateTime<Local>,
) -> Series {
    let doctor_departments: HashMap<&str, Department> = doctors
        .iter()
        .map(|d| (d.id.as_str(), d.department))
        .collect();
    let since = month_start(now);

    // 保持首次出现的顺序，排序稳定
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut bump = |label: &str| match counts.iter_mut().find(|(l, _)| l == label) {
        Some((_, count)) => *count += 1,
        None => counts.push((label.to_string(), 1)),
    };

    for registration in registrations {
        let Some(time) = registration.effective_time() else {
            continue;
        };
        if since.map(|since| time < since).unwrap_or(false) {
            continue;
        }

        let mut departments = registration.effective_departments();
        if departments.is_empty() {
            if let Some(dept) = doctor_departments.get(registration.doctor_id.as_str()) {
                departments.push(*dept);
            }
        }

        if departments.is_empty() {
            bump(UNKNOWN_LABEL);
        } else {
            for dept in departments {
                bump(dept.label());
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let other: usize = counts.iter().skip(TOP_DEPARTMENTS).map(|(_, c)| c).sum();
    let mut labels: Vec<String> = Vec::new();
    let mut data: Vec<usize> = Vec::new();
    for (label, count) in counts.into_iter().take(TOP_DEPARTMENTS) {
        labels.push(label);
        data.push(count);
    }
    if other > 0 {
        labels.push(OTHER_LABEL.to_string());
        data.push(other);
    }

    if labels.is_empty() {
        for dept in Department::ALL.iter().take(TOP_DEPARTMENTS) {
            labels.push(dept.label().to_string());
            data.push(0);
        }
        labels.push(OTHER_LABEL.to_string());
        data.push(0);
    }

    Series {
        title: DEPARTMENT_TITLE.to_string(),
        labels,
        data,
    }
}

pub fn build(snapshot: &IndexSnapshot, now: &DateTime<Local>) -> ReportData {
    ReportData {
        weekly: weekly_trend(&snapshot.registrations, now),
        departments: department_distribution(&snapshot.registrations, &snapshot.doctors, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).earliest().unwrap()
    }

    fn registered_at(time: DateTime<Local>, departments: Vec<Department>) -> Registration {
        Registration {
            registration_date: Some(time.with_timezone(&Utc)),
            departments,
            ..Default::default()
        }
    }

    #[test]
    fn test_week_starts_on_monday() {
        // 2024-03-10 是周日
        let sunday = local(2024, 3, 10, 12);
        assert_eq!(sunday.weekday(), Weekday::Sun);
        assert_eq!(week_start(&sunday), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn test_weekly_trend_buckets() {
        let now = local(2024, 3, 6, 15); // 周三
        let registrations = vec![
            registered_at(local(2024, 3, 4, 9), vec![]),
            registered_at(local(2024, 3, 6, 9), vec![]),
            registered_at(local(2024, 3, 6, 10), vec![]),
            registered_at(local(2024, 3, 3, 9), vec![]), // 上周日
            Registration::default(),
        ];
        let series = weekly_trend(&registrations, &now);
        assert_eq!(series.data, vec![1, 0, 2, 0, 0, 0, 0]);
        assert_eq!(series.labels[6], "周日");
    }

    #[test]
    fn test_department_distribution_top_five() {
        let now = local(2024, 3, 20, 12);
        let at = local(2024, 3, 5, 9);
        let mut registrations = Vec::new();
        for (dept, n) in [
            (Department::InternalMedicine, 5),
            (Department::Surgery, 4),
            (Department::Pediatrics, 3),
            (Department::Ophthalmology, 3),
            (Department::Dermatology, 2),
            (Department::Stomatology, 1),
            (Department::ChineseMedicine, 1),
        ] {
            for _ in 0..n {
                registrations.push(registered_at(at, vec![dept]));
            }
        }
        // 上月数据不计入
        registrations.push(registered_at(local(2024, 2, 28, 9), vec![Department::Surgery]));

        let series = department_distribution(&registrations, &[], &now);
        let points: Vec<(&str, usize)> = series.points().collect();
        assert_eq!(
            points,
            vec![
                ("内科", 5),
                ("外科", 4),
                ("儿科", 3),
                ("眼科", 3),
                ("皮肤科", 2),
                ("其他", 2)
            ]
        );
    }

    #[test]
    fn test_department_distribution_fallbacks() {
        let now = local(2024, 3, 20, 12);
        let doctor: Doctor = serde_json::from_value(serde_json::json!({
            "id": "d1", "name": "张医生", "department": "口腔科"
        }))
        .unwrap();
        let mut with_doctor = registered_at(local(2024, 3, 2, 9), vec![]);
        with_doctor.doctor_id = "d1".to_string();
        let orphan = registered_at(local(2024, 3, 2, 9), vec![]);

        let series = department_distribution(&[with_doctor, orphan], &[doctor], &now);
        assert_eq!(series.labels, vec!["口腔科", "未知"]);
        assert_eq!(series.data, vec![1, 1]);
    }

    #[test]
    fn test_department_distribution_empty() {
        let now = local(2024, 3, 20, 12);
        let series = department_distribution(&[], &[], &now);
        assert_eq!(series.labels, vec!["内科", "外科", "儿科", "妇产科", "眼科", "其他"]);
        assert!(series.data.iter().all(|c| *c == 0));
    }
}
