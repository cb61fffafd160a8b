//! 核心数据模型定义
//!
//! 字段命名与后端 JSON 保持一致（camelCase）。后端可能返回空字符串或
//! 零值时间，因此时间字段统一使用宽松解析，无法解析时视为缺失。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 账号角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 管理员 - 完全访问权限
    Admin,
    /// 医生 - 病种维护和挂号处理
    Doctor,
    /// 病人 - 仅能为本人挂号
    Patient,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim() {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "patient" => Some(Role::Patient),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    /// 侧边栏展示用的中文名称
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "管理员",
            Role::Doctor => "医生",
            Role::Patient => "病人",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 当前登录账号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub username: Option<String>,
    pub role: Role,
    /// 病人账号关联的病人档案ID，医生账号关联的医生ID
    pub linked_id: Option<String>,
}

impl Identity {
    /// 侧边栏显示名：优先用户名，其次账号ID
    pub fn display_name(&self) -> &str {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}

/// 科室（病种分类与医生科室共用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Department {
    InternalMedicine, // 内科
    Surgery,          // 外科
    Pediatrics,       // 儿科
    Gynecology,       // 妇产科
    Ophthalmology,    // 眼科
    Otolaryngology,   // 耳鼻喉科
    Stomatology,      // 口腔科
    Dermatology,      // 皮肤科
    ChineseMedicine,  // 中医科
    Other,            // 其他
}

impl Department {
    pub const ALL: [Department; 10] = [
        Department::InternalMedicine,
        Department::Surgery,
        Department::Pediatrics,
        Department::Gynecology,
        Department::Ophthalmology,
        Department::Otolaryngology,
        Department::Stomatology,
        Department::Dermatology,
        Department::ChineseMedicine,
        Department::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Department::InternalMedicine => "内科",
            Department::Surgery => "外科",
            Department::Pediatrics => "儿科",
            Department::Gynecology => "妇产科",
            Department::Ophthalmology => "眼科",
            Department::Otolaryngology => "耳鼻喉科",
            Department::Stomatology => "口腔科",
            Department::Dermatology => "皮肤科",
            Department::ChineseMedicine => "中医科",
            Department::Other => "其他",
        }
    }

    pub fn parse(value: &str) -> Option<Department> {
        let value = value.trim();
        Department::ALL.iter().copied().find(|d| d.label() == value)
    }

    /// 病种分类可选项（不含"其他"）
    pub fn disease_categories() -> &'static [Department] {
        &Department::ALL[..9]
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Department {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Department {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Department::parse(&raw).unwrap_or(Department::Other))
    }
}

/// 性别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// 接受表单值"男"/"女"，也接受 male/female
    pub fn parse(value: &str) -> Option<Gender> {
        match value.trim() {
            "男" | "male" => Some(Gender::Male),
            "女" | "female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "男",
            Gender::Female => "女",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 病人信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    pub id: String,
    pub name: String,
    /// 后端原样保存的性别文本，解析见 [`Patient::gender`]
    #[serde(rename = "gender")]
    pub gender_text: String,
    pub age: i64,
    pub phone: String,
    pub id_card: String,
    pub address: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    #[serde(deserialize_with = "lenient_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_time")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn gender(&self) -> Option<Gender> {
        Gender::parse(&self.gender_text)
    }

    /// 动态时间：创建时间，缺失时使用更新时间
    pub fn activity_time(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.updated_at)
    }
}

/// 病种
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disease {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: Department,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub symptoms: String,
    #[serde(default)]
    pub treatment: String,
}

/// 出诊安排
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkSchedule {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub is_available: bool,
}

/// 医生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub department: Department,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub photo: Option<String>,
    /// 管理的病种ID列表 (1-3个)
    #[serde(default, deserialize_with = "null_as_default")]
    pub diseases: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub work_schedule: Vec<WorkSchedule>,
    /// 每日最大接诊数
    #[serde(default)]
    pub max_patients: i64,
    /// 挂号费
    #[serde(default)]
    pub fee: f64,
}

impl Doctor {
    /// 可出诊的日期名称
    pub fn available_days(&self) -> Vec<&str> {
        self.work_schedule
            .iter()
            .filter(|s| s.is_available)
            .map(|s| s.day_of_week.as_str())
            .collect()
    }
}

/// 挂号状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,   // 待处理
    Confirmed, // 已确认
    Completed, // 已完成
    Cancelled, // 已取消
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 4] = [
        RegistrationStatus::Pending,
        RegistrationStatus::Confirmed,
        RegistrationStatus::Completed,
        RegistrationStatus::Cancelled,
    ];

    pub fn parse(value: &str) -> Option<RegistrationStatus> {
        RegistrationStatus::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == value.trim())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Completed => "completed",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "待处理",
            RegistrationStatus::Confirmed => "已确认",
            RegistrationStatus::Completed => "已完成",
            RegistrationStatus::Cancelled => "已取消",
        }
    }
}

impl Default for RegistrationStatus {
    fn default() -> Self {
        RegistrationStatus::Pending
    }
}

/// 挂号记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registration {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    /// 旧数据仅有单个科室
    #[serde(deserialize_with = "lenient_department")]
    pub department: Option<Department>,
    #[serde(deserialize_with = "null_as_default")]
    pub departments: Vec<Department>,
    #[serde(deserialize_with = "lenient_time")]
    pub registration_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_time")]
    pub visit_date: Option<DateTime<Utc>>,
    pub time_slot: String,
    pub status: RegistrationStatus,
    pub symptoms: String,
    pub notes: String,
    #[serde(deserialize_with = "lenient_time")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Registration {
    /// 有效科室列表：departments 非空时使用之，否则回退到单个 department
    pub fn effective_departments(&self) -> Vec<Department> {
        if !self.departments.is_empty() {
            self.departments.clone()
        } else {
            self.department.into_iter().collect()
        }
    }

    /// 挂号发生时间：registrationDate → createdAt → visitDate，取第一个存在的值
    pub fn effective_time(&self) -> Option<DateTime<Utc>> {
        self.registration_date
            .or(self.created_at)
            .or(self.visit_date)
    }
}

/// 首页概览数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSnapshot {
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
}

fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    })
}

fn lenient_department<'de, D>(deserializer: D) -> Result<Option<Department>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Department::parse))
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
