//! 表单草稿与校验
//!
//! 对话框中的输入统一保存为字符串草稿，提交前校验并转换为请求体。
//! 校验按规则顺序进行，返回第一条失败规则的提示。

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use hospital_client::AssignAccountRequest;
use hospital_core::utils::{is_valid_id_card, is_valid_phone};
use hospital_core::{
    Department, Disease, Doctor, Gender, HospitalError, Patient, Registration, RegistrationStatus,
    Result, WorkSchedule,
};
use serde::Serialize;

pub const MSG_REQUIRED_FIELDS: &str = "请填写所有必填字段！";

fn invalid(message: &str) -> HospitalError {
    HospitalError::Validation(message.to_string())
}

// ---------------------------------------------------------------------------
// 病人
// ---------------------------------------------------------------------------

/// 病人表单
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientDraft {
    pub name: String,
    /// 男 / 女
    pub gender: String,
    pub age: String,
    pub phone: String,
    pub id_card: String,
    pub address: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
}

/// 病人请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPayload {
    pub name: String,
    pub gender: String,
    pub age: i64,
    pub phone: String,
    pub id_card: String,
    pub address: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
}

impl PatientDraft {
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            gender: patient.gender_text.clone(),
            age: patient.age.to_string(),
            phone: patient.phone.clone(),
            id_card: patient.id_card.clone(),
            address: patient.address.clone(),
            emergency_contact: patient.emergency_contact.clone(),
            emergency_phone: patient.emergency_phone.clone(),
        }
    }

    pub fn validate(&self) -> Result<PatientPayload> {
        let name = self.name.trim();
        let phone = self.phone.trim();
        let id_card = self.id_card.trim();
        let address = self.address.trim();
        let emergency_contact = self.emergency_contact.trim();

        if name.is_empty() {
            return Err(invalid("请填写姓名"));
        }
        let gender = Gender::parse(&self.gender).ok_or_else(|| invalid("请选择性别（男/女）"))?;
        let age: i64 = self
            .age
            .trim()
            .parse()
            .map_err(|_| invalid("请输入正确的年龄"))?;
        if !(1..=150).contains(&age) {
            return Err(invalid("年龄必须在 1-150 之间"));
        }
        if phone.is_empty() {
            return Err(invalid("请填写电话"));
        }
        if !is_valid_phone(phone) {
            return Err(invalid("电话必须为 11 位数字"));
        }
        if id_card.is_empty() {
            return Err(invalid("请填写身份证号"));
        }
        if !is_valid_id_card(id_card) {
            return Err(invalid("身份证号格式不正确（应为 18 位）"));
        }
        if address.is_empty() {
            return Err(invalid("请填写地址"));
        }
        if emergency_contact.is_empty() {
            return Err(invalid("请填写紧急联系人"));
        }

        Ok(PatientPayload {
            name: name.to_string(),
            gender: gender.label().to_string(),
            age,
            phone: phone.to_string(),
            id_card: id_card.to_string(),
            address: address.to_string(),
            emergency_contact: emergency_contact.to_string(),
            emergency_phone: self.emergency_phone.trim().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// 病种
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiseaseDraft {
    pub name: String,
    pub category: String,
    pub description: String,
    pub symptoms: String,
    pub treatment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseasePayload {
    pub name: String,
    pub category: Department,
    pub description: String,
    pub symptoms: String,
    pub treatment: String,
}

impl DiseaseDraft {
    pub fn from_disease(disease: &Disease) -> Self {
        Self {
            name: disease.name.clone(),
            category: disease.category.label().to_string(),
            description: disease.description.clone(),
            symptoms: disease.symptoms.clone(),
            treatment: disease.treatment.clone(),
        }
    }

    pub fn validate(&self) -> Result<DiseasePayload> {
        let name = self.name.trim();
        let category = Department::parse(&self.category);
        match (name.is_empty(), category) {
            (false, Some(category)) => Ok(DiseasePayload {
                name: name.to_string(),
                category,
                description: self.description.clone(),
                symptoms: self.symptoms.clone(),
                treatment: self.treatment.clone(),
            }),
            _ => Err(invalid(MSG_REQUIRED_FIELDS)),
        }
    }
}

// ---------------------------------------------------------------------------
// 医生
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_PATIENTS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct DoctorDraft {
    pub name: String,
    pub department: String,
    pub title: String,
    pub introduction: String,
    /// 勾选的病种ID
    pub diseases: Vec<String>,
    pub max_patients: String,
    pub fee: String,
    /// 编辑时沿用原有照片与出诊安排
    pub photo: Option<String>,
    pub work_schedule: Vec<WorkSchedule>,
}

impl Default for DoctorDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            department: String::new(),
            title: String::new(),
            introduction: String::new(),
            diseases: Vec::new(),
            max_patients: DEFAULT_MAX_PATIENTS.to_string(),
            fee: "0".to_string(),
            photo: None,
            work_schedule: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPayload {
    pub name: String,
    pub department: Department,
    pub title: String,
    pub introduction: String,
    pub photo: String,
    pub diseases: Vec<String>,
    pub max_patients: i64,
    pub fee: f64,
    pub work_schedule: Vec<WorkSchedule>,
}

impl DoctorDraft {
    pub fn from_doctor(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            department: doctor.department.label().to_string(),
            title: doctor.title.clone(),
            introduction: doctor.introduction.clone(),
            diseases: doctor.diseases.clone(),
            max_patients: doctor.max_patients.to_string(),
            fee: doctor.fee.to_string(),
            photo: doctor.photo.clone(),
            work_schedule: doctor.work_schedule.clone(),
        }
    }

    /// 勾选或取消勾选病种
    pub fn toggle_disease(&mut self, disease_id: &str) {
        match self.diseases.iter().position(|d| d == disease_id) {
            Some(index) => {
                self.diseases.remove(index);
            }
            None => self.diseases.push(disease_id.to_string()),
        }
    }

    pub fn validate(&self) -> Result<DoctorPayload> {
        if self.diseases.is_empty() || self.diseases.len() > 3 {
            return Err(invalid("请选择1-3个病种"));
        }

        let name = self.name.trim();
        let title = self.title.trim();
        let department = match Department::parse(&self.department) {
            Some(department) if !name.is_empty() && !title.is_empty() => department,
            _ => return Err(invalid(MSG_REQUIRED_FIELDS)),
        };

        let max_patients = match self.max_patients.trim() {
            "" => DEFAULT_MAX_PATIENTS,
            raw => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| invalid("请输入正确的每日限额"))?,
        };
        let fee = match self.fee.trim() {
            "" => 0.0,
            raw => raw
                .parse::<f64>()
                .ok()
                .filter(|fee| fee.is_finite() && *fee >= 0.0)
                .ok_or_else(|| invalid("请输入正确的挂号费"))?,
        };

        Ok(DoctorPayload {
            name: name.to_string(),
            department,
            title: title.to_string(),
            introduction: self.introduction.clone(),
            photo: self.photo.clone().unwrap_or_default(),
            diseases: self.diseases.clone(),
            max_patients,
            fee,
            work_schedule: self.work_schedule.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// 分配账号
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountDraft {
    pub username: String,
    pub password: String,
    pub confirm: String,
}

impl AccountDraft {
    pub fn validate(&self, doctor_id: &str) -> Result<AssignAccountRequest> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(invalid("请输入账号"));
        }
        if self.password.is_empty() {
            return Err(invalid("请输入密码"));
        }
        if self.password != self.confirm {
            return Err(invalid("两次输入的密码不一致"));
        }
        Ok(AssignAccountRequest {
            doctor_id: doctor_id.to_string(),
            username: username.to_string(),
            password: self.password.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// 挂号
// ---------------------------------------------------------------------------

/// 挂号对话框的打开方式
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationMode {
    /// 管理员新增
    Create,
    /// 病人为本人挂号（提交病症）
    PatientCreate { linked_patient_id: String },
    /// 管理员编辑
    Edit { original: Registration },
    /// 医生处理挂号：仅状态与备注可改
    DoctorEdit { original: Registration },
}

impl RegistrationMode {
    pub fn title(&self) -> &'static str {
        match self {
            RegistrationMode::Create => "新增挂号",
            RegistrationMode::PatientCreate { .. } => "提交病症",
            RegistrationMode::Edit { .. } | RegistrationMode::DoctorEdit { .. } => "编辑挂号",
        }
    }

    /// 正在编辑的挂号ID
    pub fn editing_id(&self) -> Option<&str> {
        match self {
            RegistrationMode::Edit { original } | RegistrationMode::DoctorEdit { original } => {
                Some(&original.id)
            }
            _ => None,
        }
    }

    /// 病人、医生、日期、时间段与科室是否锁定
    pub fn locks_facts(&self) -> bool {
        matches!(self, RegistrationMode::DoctorEdit { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationDraft {
    pub patient_id: String,
    pub doctor_id: String,
    pub departments: Vec<Department>,
    /// YYYY-MM-DD
    pub visit_date: String,
    pub time_slot: String,
    /// 状态下拉框的取值，未显示时为 `None`
    pub status: Option<RegistrationStatus>,
    pub symptoms: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub patient_id: String,
    pub doctor_id: String,
    /// 主科室，即 departments[0]
    pub department: Department,
    pub departments: Vec<Department>,
    pub visit_date: DateTime<Utc>,
    pub time_slot: String,
    pub status: RegistrationStatus,
    pub symptoms: String,
    pub notes: String,
}

/// 本地日期的零点
pub fn local_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// 解析 `YYYY-MM-DD`
pub fn parse_form_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// 日期控件显示值（本地日期）
pub fn format_form_date(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

impl RegistrationDraft {
    pub fn from_registration(registration: &Registration, show_status: bool) -> Self {
        Self {
            patient_id: registration.patient_id.clone(),
            doctor_id: registration.doctor_id.clone(),
            departments: registration.effective_departments(),
            visit_date: registration
                .visit_date
                .as_ref()
                .map(format_form_date)
                .unwrap_or_default(),
            time_slot: registration.time_slot.clone(),
            status: show_status.then_some(registration.status),
            symptoms: registration.symptoms.clone(),
            notes: registration.notes.clone(),
        }
    }

    pub fn toggle_department(&mut self, department: Department) {
        match self.departments.iter().position(|d| *d == department) {
            Some(index) => {
                self.departments.remove(index);
            }
            None => self.departments.push(department),
        }
    }

    /// 选择医生；尚未勾选科室时自动勾选该医生的科室
    pub fn select_doctor(&mut self, doctor_id: &str, doctors: &[Doctor]) {
        self.doctor_id = doctor_id.to_string();
        if self.departments.is_empty() {
            if let Some(doctor) = doctors.iter().find(|d| d.id == doctor_id) {
                self.departments.push(doctor.department);
            }
        }
    }

    pub fn validate(&self, mode: &RegistrationMode) -> Result<RegistrationPayload> {
        if let RegistrationMode::DoctorEdit { original } = mode {
            return self.validate_doctor_edit(original);
        }

        let patient_id = match mode {
            RegistrationMode::PatientCreate { linked_patient_id } => linked_patient_id.trim(),
            _ => self.patient_id.trim(),
        };
        let doctor_id = self.doctor_id.trim();
        let time_slot = self.time_slot.trim();

        if patient_id.is_empty()
            || doctor_id.is_empty()
            || self.visit_date.trim().is_empty()
            || time_slot.is_empty()
        {
            return Err(invalid(MSG_REQUIRED_FIELDS));
        }
        let department = *self
            .departments
            .first()
            .ok_or_else(|| invalid("请选择至少1个科室！"))?;

        let patient_create = matches!(mode, RegistrationMode::PatientCreate { .. });
        if patient_create && self.symptoms.trim().is_empty() {
            return Err(invalid("请填写症状描述"));
        }

        let visit_date = parse_form_date(&self.visit_date)
            .and_then(local_midnight)
            .ok_or_else(|| invalid("就诊日期格式不正确"))?;

        let status = if patient_create {
            RegistrationStatus::Pending
        } else {
            self.status.unwrap_or_default()
        };

        Ok(RegistrationPayload {
            patient_id: patient_id.to_string(),
            doctor_id: doctor_id.to_string(),
            department,
            departments: self.departments.clone(),
            visit_date,
            time_slot: time_slot.to_string(),
            status,
            symptoms: self.symptoms.clone(),
            notes: self.notes.clone(),
        })
    }

    /// 医生编辑：锁定字段一律取自原挂号记录
    fn validate_doctor_edit(&self, original: &Registration) -> Result<RegistrationPayload> {
        let departments = original.effective_departments();
        let visit_date = match original.visit_date {
            Some(visit_date)
                if !original.patient_id.is_empty()
                    && !original.doctor_id.is_empty()
                    && !original.time_slot.is_empty() =>
            {
                visit_date
            }
            _ => return Err(invalid(MSG_REQUIRED_FIELDS)),
        };
        let department = *departments
            .first()
            .ok_or_else(|| invalid("请选择至少1个科室！"))?;

        Ok(RegistrationPayload {
            patient_id: original.patient_id.clone(),
            doctor_id: original.doctor_id.clone(),
            department,
            departments,
            visit_date,
            time_slot: original.time_slot.clone(),
            status: self.status.unwrap_or(original.status),
            symptoms: original.symptoms.clone(),
            notes: self.notes.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_patient() -> PatientDraft {
        PatientDraft {
            name: "王五".to_string(),
            gender: "男".to_string(),
            age: "35".to_string(),
            phone: "13800000000".to_string(),
            id_card: "110101199001011234".to_string(),
            address: "北京市东城区".to_string(),
            emergency_contact: "王六".to_string(),
            emergency_phone: String::new(),
        }
    }

    fn message(err: HospitalError) -> String {
        err.to_string()
    }

    #[test]
    fn test_valid_patient_passes() {
        let payload = valid_patient().validate().unwrap();
        assert_eq!(payload.gender, "男");
        assert_eq!(payload.age, 35);
    }

    #[test]
    fn test_patient_phone_rules() {
        for phone in [
            "1380000000",
            "138000000001",
            "1380000000a",
            "138 0000 000",
            "١٣٨٠٠٠٠٠٠٠٠",
        ] {
            let mut draft = valid_patient();
            draft.phone = phone.to_string();
            assert_eq!(message(draft.validate().unwrap_err()), "电话必须为 11 位数字");
        }
        let mut draft = valid_patient();
        draft.phone = "  ".to_string();
        assert_eq!(message(draft.validate().unwrap_err()), "请填写电话");
    }

    #[test]
    fn test_patient_first_failing_rule_wins() {
        let draft = PatientDraft::default();
        assert_eq!(message(draft.validate().unwrap_err()), "请填写姓名");

        let mut draft = valid_patient();
        draft.gender = "未知".to_string();
        draft.age = "abc".to_string();
        assert_eq!(message(draft.validate().unwrap_err()), "请选择性别（男/女）");

        let mut draft = valid_patient();
        draft.age = "abc".to_string();
        assert_eq!(message(draft.validate().unwrap_err()), "请输入正确的年龄");

        let mut draft = valid_patient();
        draft.age = "151".to_string();
        assert_eq!(message(draft.validate().unwrap_err()), "年龄必须在 1-150 之间");

        let mut draft = valid_patient();
        draft.id_card = "12345".to_string();
        assert_eq!(
            message(draft.validate().unwrap_err()),
            "身份证号格式不正确（应为 18 位）"
        );

        let mut draft = valid_patient();
        draft.id_card = "1١0101199001011234".to_string();
        assert_eq!(
            message(draft.validate().unwrap_err()),
            "身份证号格式不正确（应为 18 位）"
        );

        let mut draft = valid_patient();
        draft.emergency_contact = String::new();
        assert_eq!(message(draft.validate().unwrap_err()), "请填写紧急联系人");
    }

    #[test]
    fn test_disease_requires_name_and_category() {
        let mut draft = DiseaseDraft {
            name: "感冒".to_string(),
            category: "内科".to_string(),
            ..Default::default()
        };
        assert_eq!(draft.validate().unwrap().category, Department::InternalMedicine);

        draft.category = String::new();
        assert_eq!(message(draft.validate().unwrap_err()), MSG_REQUIRED_FIELDS);
    }

    #[test]
    fn test_doctor_validation() {
        let mut draft = DoctorDraft {
            name: "李医生".to_string(),
            department: "外科".to_string(),
            title: "主治医师".to_string(),
            max_patients: String::new(),
            fee: String::new(),
            ..Default::default()
        };
        assert_eq!(message(draft.validate().unwrap_err()), "请选择1-3个病种");

        for id in ["a", "b", "c", "d"] {
            draft.toggle_disease(id);
        }
        assert_eq!(message(draft.validate().unwrap_err()), "请选择1-3个病种");
        draft.toggle_disease("d");

        let payload = draft.validate().unwrap();
        assert_eq!(payload.max_patients, DEFAULT_MAX_PATIENTS);
        assert_eq!(payload.fee, 0.0);
        assert_eq!(payload.photo, "");

        draft.fee = "-1".to_string();
        assert_eq!(message(draft.validate().unwrap_err()), "请输入正确的挂号费");
        draft.fee = String::new();

        for limit in ["-5", "0", "abc", "2.5"] {
            draft.max_patients = limit.to_string();
            assert_eq!(message(draft.validate().unwrap_err()), "请输入正确的每日限额");
        }
        draft.max_patients = "12".to_string();
        assert_eq!(draft.validate().unwrap().max_patients, 12);

        draft.fee = "12.5".to_string();
        draft.title = " ".to_string();
        assert_eq!(message(draft.validate().unwrap_err()), MSG_REQUIRED_FIELDS);
    }

    #[test]
    fn test_account_validation() {
        let mut draft = AccountDraft {
            username: "doc1".to_string(),
            password: "secret".to_string(),
            confirm: "secreT".to_string(),
        };
        assert_eq!(message(draft.validate("d1").unwrap_err()), "两次输入的密码不一致");
        draft.confirm = "secret".to_string();
        let request = draft.validate("d1").unwrap();
        assert_eq!(request.doctor_id, "d1");
        assert_eq!(request.username, "doc1");
    }

    fn base_registration_draft() -> RegistrationDraft {
        RegistrationDraft {
            patient_id: "p1".to_string(),
            doctor_id: "d1".to_string(),
            departments: vec![Department::Surgery],
            visit_date: "2024-03-05".to_string(),
            time_slot: "09:00-09:30".to_string(),
            status: Some(RegistrationStatus::Confirmed),
            symptoms: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_registration_required_fields_and_departments() {
        let mut draft = base_registration_draft();
        draft.time_slot = String::new();
        assert_eq!(
            message(draft.validate(&RegistrationMode::Create).unwrap_err()),
            MSG_REQUIRED_FIELDS
        );

        let mut draft = base_registration_draft();
        draft.departments.clear();
        assert_eq!(
            message(draft.validate(&RegistrationMode::Create).unwrap_err()),
            "请选择至少1个科室！"
        );

        let mut draft = base_registration_draft();
        draft.visit_date = "2024/03/05".to_string();
        assert_eq!(
            message(draft.validate(&RegistrationMode::Create).unwrap_err()),
            "就诊日期格式不正确"
        );
    }

    #[test]
    fn test_registration_visit_date_is_local_midnight() {
        let payload = base_registration_draft()
            .validate(&RegistrationMode::Create)
            .unwrap();
        assert_eq!(format_form_date(&payload.visit_date), "2024-03-05");
        assert_eq!(payload.status, RegistrationStatus::Confirmed);
        assert_eq!(payload.department, Department::Surgery);
    }

    #[test]
    fn test_patient_create_forces_self_and_pending() {
        let mode = RegistrationMode::PatientCreate {
            linked_patient_id: "me".to_string(),
        };
        let mut draft = base_registration_draft();
        draft.patient_id = "someone-else".to_string();
        assert_eq!(message(draft.validate(&mode).unwrap_err()), "请填写症状描述");

        draft.symptoms = "发热".to_string();
        let payload = draft.validate(&mode).unwrap();
        assert_eq!(payload.patient_id, "me");
        assert_eq!(payload.status, RegistrationStatus::Pending);
    }

    #[test]
    fn test_doctor_edit_takes_locked_facts_from_original() {
        let original = Registration {
            id: "r1".to_string(),
            patient_id: "p1".to_string(),
            doctor_id: "d1".to_string(),
            department: Some(Department::Ophthalmology),
            visit_date: local_midnight(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
            time_slot: "10:00-10:30".to_string(),
            symptoms: "视物模糊".to_string(),
            ..Default::default()
        };
        let mode = RegistrationMode::DoctorEdit {
            original: original.clone(),
        };
        let mut draft = RegistrationDraft::from_registration(&original, true);
        draft.patient_id = "tampered".to_string();
        draft.time_slot = "23:00".to_string();
        draft.symptoms = "tampered".to_string();
        draft.status = Some(RegistrationStatus::Completed);
        draft.notes = "已就诊".to_string();

        let payload = draft.validate(&mode).unwrap();
        assert_eq!(payload.patient_id, "p1");
        assert_eq!(payload.time_slot, "10:00-10:30");
        assert_eq!(payload.symptoms, "视物模糊");
        assert_eq!(payload.departments, vec![Department::Ophthalmology]);
        assert_eq!(payload.status, RegistrationStatus::Completed);
        assert_eq!(payload.notes, "已就诊");
        assert!(mode.locks_facts());
    }

    #[test]
    fn test_select_doctor_checks_department_when_none() {
        let doctor: Doctor = serde_json::from_value(serde_json::json!({
            "id": "d1", "name": "张医生", "department": "儿科"
        }))
        .unwrap();
        let mut draft = RegistrationDraft::default();
        draft.select_doctor("d1", std::slice::from_ref(&doctor));
        assert_eq!(draft.departments, vec![Department::Pediatrics]);

        let mut draft = RegistrationDraft {
            departments: vec![Department::Surgery],
            ..Default::default()
        };
        draft.select_doctor("d1", std::slice::from_ref(&doctor));
        assert_eq!(draft.departments, vec![Department::Surgery]);
    }
}
