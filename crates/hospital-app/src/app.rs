//! 应用主流程
//!
//! [`App`] 独占 [`AppState`]，负责页面切换、数据加载、对话框的打开与提交。
//! 所有修改操作在发请求前再检查一次角色权限。

use chrono::Local;
use hospital_client::{
    ApiClient, FileTokenStore, HttpTransport, MemoryTokenStore, Resource, TokenStore, Transport,
};
use hospital_core::{
    Department, Disease, Doctor, HospitalError, Identity, Patient, Registration,
    RegistrationStatus, Result, Role,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::dashboard;
use crate::forms::{
    AccountDraft, DiseaseDraft, DoctorDraft, PatientDraft, RegistrationDraft, RegistrationMode,
};
use crate::loaders::{self, Prompt};
use crate::policy::{self, Action, Page};
use crate::render;
use crate::reports;
use crate::router;
use crate::session::SessionStore;
use crate::state::{AppState, Dialog, GenderFilter, MSG_LOAD_FAILED};

pub const MSG_ASSIGNED: &str = "分配成功";
const MSG_ASSIGN_FAILED: &str = "分配失败";

/// 可增删改的实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Patient,
    Disease,
    Doctor,
    Registration,
}

pub struct App {
    client: ApiClient,
    session: SessionStore,
    prompt: Arc<dyn Prompt>,
    state: AppState,
    activity_limit: usize,
}

impl App {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        let client =
            ApiClient::new(transport).with_paths(&config.api.prefix, &config.api.index_path);
        Self {
            client,
            session: SessionStore::new(tokens),
            prompt,
            state: AppState::default(),
            activity_limit: config.dashboard.activity_limit,
        }
    }

    /// 按配置创建HTTP传输与令牌存储
    pub fn from_config(config: &AppConfig, prompt: Arc<dyn Prompt>) -> Result<Self> {
        let transport = HttpTransport::new(&config.api.base_url, config.api.timeout())?;
        let tokens: Arc<dyn TokenStore> = match &config.session.state_dir {
            Some(dir) => Arc::new(FileTokenStore::new(dir, &config.session.token_key)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        info!("Backend: {}", config.api.base_url);
        Ok(Self::new(config, Arc::new(transport), tokens, prompt))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.identity()
    }

    pub fn role(&self) -> Option<Role> {
        self.session.role()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn take_notices(&mut self) -> Vec<crate::state::Notice> {
        self.state.take_notices()
    }

    /// 渲染完整界面
    pub fn render(&self) -> Result<String> {
        render::render_screen(&self.state, self.identity())
    }

    // -----------------------------------------------------------------------
    // 会话与路由
    // -----------------------------------------------------------------------

    /// 启动：恢复会话后进入请求的位置
    pub async fn start(&mut self, location: &str) -> Page {
        self.session.restore(&mut self.client).await;
        self.navigate(location).await
    }

    /// 登录后进入角色默认页
    pub async fn login(&mut self, username: &str, password: &str) -> bool {
        self.login_to(username, password, "").await
    }

    /// 登录后直接进入 `location`，只加载一次目标页数据
    pub async fn login_to(&mut self, username: &str, password: &str, location: &str) -> bool {
        match self.session.login(&mut self.client, username, password).await {
            Ok(()) => {
                self.state.login_error = None;
                self.navigate(location).await;
                true
            }
            Err(message) => {
                self.state.login_error = Some(message);
                self.show(Page::Login);
                false
            }
        }
    }

    pub fn logout(&mut self) {
        self.session.logout(&mut self.client);
        self.state.reset_data();
        self.show(Page::Login);
    }

    /// 切换页面并加载该页数据
    pub async fn navigate(&mut self, location: &str) -> Page {
        let page = router::resolve_location(location, self.role());
        if router::parse_location(location) != Some(page) {
            debug!("Redirect {} -> {}", location, page.hash());
        }
        self.show(page);
        self.load_page_data().await;
        page
    }

    fn show(&mut self, page: Page) {
        self.state.page = page;
        self.state.location = page.hash();
    }

    /// 重新加载当前页面数据
    pub async fn load_page_data(&mut self) {
        let role = self.role();
        match self.state.page {
            Page::Login => {}
            Page::Dashboard => self.load_dashboard().await,
            Page::Patients => {
                loaders::load_patients(&self.client, &mut self.state).await;
            }
            Page::Diseases => {
                loaders::load_diseases(&self.client, &mut self.state).await;
            }
            Page::Doctors => {
                loaders::load_doctors(&self.client, &mut self.state).await;
            }
            Page::Registrations => {
                loaders::load_registrations(&self.client, &mut self.state, role).await;
            }
            Page::Reports => self.load_reports().await,
        }
    }

    async fn load_dashboard(&mut self) {
        let snapshot = match self.client.index_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to load dashboard: {}", e);
                self.state.dashboard.error = Some(MSG_LOAD_FAILED.to_string());
                return;
            }
        };
        // 病种数量获取失败按0计
        let disease_count = match self.client.list::<Disease>().await {
            Ok(diseases) => diseases.len(),
            Err(e) => {
                warn!("Failed to count diseases: {}", e);
                0
            }
        };
        let summary = dashboard::summarize(
            &snapshot,
            disease_count,
            &Local::now(),
            self.activity_limit,
        );
        self.state.dashboard.summary = Some(summary);
        self.state.dashboard.error = None;
    }

    async fn load_reports(&mut self) {
        match self.client.index_snapshot().await {
            Ok(snapshot) => {
                self.state.reports.data = Some(reports::build(&snapshot, &Local::now()));
                self.state.reports.error = None;
            }
            Err(e) => {
                warn!("Failed to load reports: {}", e);
                self.state.reports.error = Some(MSG_LOAD_FAILED.to_string());
            }
        }
    }

    async fn reload(&mut self, entity: Entity) {
        let role = self.role();
        match entity {
            Entity::Patient => {
                loaders::load_patients(&self.client, &mut self.state).await;
            }
            Entity::Disease => {
                loaders::load_diseases(&self.client, &mut self.state).await;
            }
            Entity::Doctor => {
                loaders::load_doctors(&self.client, &mut self.state).await;
            }
            Entity::Registration => {
                loaders::load_registrations(&self.client, &mut self.state, role).await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // 筛选
    // -----------------------------------------------------------------------

    pub fn search_patients(&mut self, query: &str) {
        self.state.filters.patient_query = query.to_string();
    }

    pub fn filter_patient_gender(&mut self, gender: GenderFilter) {
        self.state.filters.patient_gender = gender;
    }

    pub fn filter_disease_category(&mut self, category: Option<Department>) {
        self.state.filters.disease_category = category;
    }

    pub fn filter_registration_status(&mut self, status: Option<RegistrationStatus>) {
        self.state.filters.registration_status = status;
    }

    /// 日期筛选，值为 `YYYY-MM-DD`，空字符串表示不筛选
    pub fn filter_registration_date(&mut self, date: &str) {
        self.state.filters.registration_date = crate::forms::parse_form_date(date);
    }

    // -----------------------------------------------------------------------
    // 权限
    // -----------------------------------------------------------------------

    /// 点击时的权限检查，不允许时提示"无权限"
    fn guard(&mut self, action: Action) -> bool {
        if policy::permits(self.role(), action) {
            return true;
        }
        warn!("Permission denied: {:?} for {:?}", action, self.role());
        self.state.alert(HospitalError::no_permission().to_string());
        false
    }

    fn find<'a, T>(items: &'a [T], id: &str, key: impl Fn(&T) -> &str) -> Option<&'a T> {
        items.iter().find(|item| key(item) == id)
    }

    // -----------------------------------------------------------------------
    // 对话框
    // -----------------------------------------------------------------------

    pub fn dialog(&self) -> Option<&Dialog> {
        self.state.dialog.as_ref()
    }

    /// 修改当前对话框中的草稿
    pub fn dialog_mut(&mut self) -> Option<&mut Dialog> {
        self.state.dialog.as_mut()
    }

    pub fn cancel_dialog(&mut self) {
        if let Some(dialog) = self.state.dialog.take() {
            debug!("Dialog cancelled: {}", dialog.title());
        }
    }

    pub fn open_create_patient(&mut self) {
        if !self.guard(Action::CreatePatient) {
            return;
        }
        self.state.dialog = Some(Dialog::Patient {
            editing: None,
            draft: PatientDraft::default(),
        });
    }

    pub fn open_edit_patient(&mut self, id: &str) {
        if !self.guard(Action::EditPatient) {
            return;
        }
        let Some(patient) = Self::find(&self.state.patients.items, id, |p| p.id.as_str()) else {
            self.state.alert("未找到该病人信息");
            return;
        };
        let draft = PatientDraft::from_patient(patient);
        self.state.dialog = Some(Dialog::Patient {
            editing: Some(id.to_string()),
            draft,
        });
    }

    pub fn open_create_disease(&mut self) {
        if !self.guard(Action::CreateDisease) {
            return;
        }
        self.state.dialog = Some(Dialog::Disease {
            editing: None,
            draft: DiseaseDraft::default(),
        });
    }

    pub fn open_edit_disease(&mut self, id: &str) {
        if !self.guard(Action::EditDisease) {
            return;
        }
        let Some(disease) = Self::find(&self.state.diseases.items, id, |d| d.id.as_str()) else {
            self.state.alert("未找到该病种信息");
            return;
        };
        let draft = DiseaseDraft::from_disease(disease);
        self.state.dialog = Some(Dialog::Disease {
            editing: Some(id.to_string()),
            draft,
        });
    }

    pub async fn open_create_doctor(&mut self) {
        if !self.guard(Action::CreateDoctor) {
            return;
        }
        if self.state.diseases.is_empty() {
            loaders::load_diseases(&self.client, &mut self.state).await;
        }
        self.state.dialog = Some(Dialog::Doctor {
            editing: None,
            draft: DoctorDraft::default(),
        });
    }

    pub async fn open_edit_doctor(&mut self, id: &str) {
        if !self.guard(Action::EditDoctor) {
            return;
        }
        let Some(doctor) = Self::find(&self.state.doctors.items, id, |d| d.id.as_str()) else {
            self.state.alert("未找到该医生信息");
            return;
        };
        let draft = DoctorDraft::from_doctor(doctor);
        if self.state.diseases.is_empty() {
            loaders::load_diseases(&self.client, &mut self.state).await;
        }
        self.state.dialog = Some(Dialog::Doctor {
            editing: Some(id.to_string()),
            draft,
        });
    }

    pub fn open_assign_account(&mut self, doctor_id: &str) {
        if !self.guard(Action::AssignDoctorAccount) {
            return;
        }
        let Some(doctor) = Self::find(&self.state.doctors.items, doctor_id, |d| d.id.as_str())
        else {
            self.state.alert("未找到该医生信息");
            return;
        };
        let doctor_name = doctor.name.clone();
        self.state.dialog = Some(Dialog::AssignAccount {
            doctor_id: doctor_id.to_string(),
            doctor_name,
            draft: AccountDraft::default(),
        });
    }

    /// 新增挂号；病人账号尚未关联档案时先打开"完善个人信息"
    pub async fn open_create_registration(&mut self) {
        if !self.guard(Action::CreateRegistration) {
            return;
        }
        if self.role() == Some(Role::Patient) && self.session.linked_patient_id().is_none() {
            info!("Patient profile missing, asking for it first");
            self.state.dialog = Some(Dialog::MyProfile {
                draft: PatientDraft::default(),
            });
            return;
        }
        self.open_registration_dialog(None).await;
    }

    pub async fn open_edit_registration(&mut self, id: &str) {
        if !self.guard(Action::EditRegistration) {
            return;
        }
        let Some(registration) = Self::find(&self.state.registrations.items, id, |r| r.id.as_str())
        else {
            self.state.alert("未找到该挂号信息");
            return;
        };
        let registration = registration.clone();
        self.open_registration_dialog(Some(registration)).await;
    }

    async fn open_registration_dialog(&mut self, original: Option<Registration>) {
        let role = self.role();
        loaders::ensure_patients(&self.client, &mut self.state, role).await;
        loaders::ensure_doctors(&self.client, &mut self.state).await;

        let show_status = policy::permits(role, Action::EditRegistration);
        let (mode, mut draft) = match original {
            Some(original) => {
                let draft = RegistrationDraft::from_registration(&original, show_status);
                let mode = if role == Some(Role::Doctor) {
                    RegistrationMode::DoctorEdit { original }
                } else {
                    RegistrationMode::Edit { original }
                };
                (mode, draft)
            }
            None => {
                let draft = RegistrationDraft {
                    status: show_status.then_some(RegistrationStatus::Pending),
                    ..Default::default()
                };
                let mode = match role {
                    Some(Role::Patient) => RegistrationMode::PatientCreate {
                        linked_patient_id: self
                            .session
                            .linked_patient_id()
                            .unwrap_or_default()
                            .to_string(),
                    },
                    _ => RegistrationMode::Create,
                };
                (mode, draft)
            }
        };

        if !mode.locks_facts() && !draft.doctor_id.is_empty() {
            let doctor_id = draft.doctor_id.clone();
            draft.select_doctor(&doctor_id, &self.state.doctors.items);
        }
        self.state.dialog = Some(Dialog::Registration { mode, draft });
    }

    /// 在挂号对话框中选择医生
    pub fn select_registration_doctor(&mut self, doctor_id: &str) {
        let doctors = &self.state.doctors.items;
        if let Some(Dialog::Registration { mode, draft }) = self.state.dialog.as_mut() {
            if !mode.locks_facts() {
                draft.select_doctor(doctor_id, doctors);
            }
        }
    }

    // -----------------------------------------------------------------------
    // 删除
    // -----------------------------------------------------------------------

    async fn delete_entity<R: Resource>(
        &mut self,
        action: Action,
        entity: Entity,
        id: &str,
    ) -> bool {
        if !self.guard(action) {
            return false;
        }
        match loaders::remove::<R>(&self.client, self.prompt.as_ref(), id).await {
            Ok(true) => {
                self.reload(entity).await;
                true
            }
            Ok(false) => false,
            Err(message) => {
                self.state.alert(message);
                false
            }
        }
    }

    pub async fn delete_patient(&mut self, id: &str) -> bool {
        self.delete_entity::<Patient>(Action::DeletePatient, Entity::Patient, id)
            .await
    }

    pub async fn delete_disease(&mut self, id: &str) -> bool {
        self.delete_entity::<Disease>(Action::DeleteDisease, Entity::Disease, id)
            .await
    }

    pub async fn delete_doctor(&mut self, id: &str) -> bool {
        self.delete_entity::<Doctor>(Action::DeleteDoctor, Entity::Doctor, id)
            .await
    }

    pub async fn delete_registration(&mut self, id: &str) -> bool {
        self.delete_entity::<Registration>(Action::DeleteRegistration, Entity::Registration, id)
            .await
    }

    // -----------------------------------------------------------------------
    // 提交
    // -----------------------------------------------------------------------

    /// 保存并在成功后关闭对话框、刷新列表
    async fn save_entity<R: Resource, B: serde::Serialize + Sync>(
        &mut self,
        entity: Entity,
        id: Option<&str>,
        body: &B,
    ) -> bool {
        match loaders::save::<R, B>(&self.client, id, body).await {
            Ok(()) => {
                info!("Saved {} {}", R::SINGULAR, id.unwrap_or("(new)"));
                self.state.close_dialog();
                self.reload(entity).await;
                true
            }
            Err(message) => {
                self.state.alert(message);
                false
            }
        }
    }

    /// 提交当前对话框；校验或请求失败时对话框保持打开
    pub async fn submit_dialog(&mut self) -> bool {
        let Some(dialog) = self.state.dialog.clone() else {
            return false;
        };

        match dialog {
            Dialog::Patient { editing, draft } => {
                let action = if editing.is_some() {
                    Action::EditPatient
                } else {
                    Action::CreatePatient
                };
                if !self.guard(action) {
                    return false;
                }
                match draft.validate() {
                    Ok(payload) => {
                        let id = editing.as_deref();
                        self.save_entity::<Patient, _>(Entity::Patient, id, &payload).await
                    }
                    Err(e) => self.reject(e),
                }
            }
            Dialog::Disease { editing, draft } => {
                let action = if editing.is_some() {
                    Action::EditDisease
                } else {
                    Action::CreateDisease
                };
                if !self.guard(action) {
                    return false;
                }
                match draft.validate() {
                    Ok(payload) => {
                        let id = editing.as_deref();
                        self.save_entity::<Disease, _>(Entity::Disease, id, &payload).await
                    }
                    Err(e) => self.reject(e),
                }
            }
            Dialog::Doctor { editing, draft } => {
                let action = if editing.is_some() {
                    Action::EditDoctor
                } else {
                    Action::CreateDoctor
                };
                if !self.guard(action) {
                    return false;
                }
                match draft.validate() {
                    Ok(payload) => {
                        let id = editing.as_deref();
                        self.save_entity::<Doctor, _>(Entity::Doctor, id, &payload).await
                    }
                    Err(e) => self.reject(e),
                }
            }
            Dialog::AssignAccount {
                doctor_id, draft, ..
            } => {
                if !self.guard(Action::AssignDoctorAccount) {
                    return false;
                }
                let request = match draft.validate(&doctor_id) {
                    Ok(request) => request,
                    Err(e) => return self.reject(e),
                };
                match self.client.assign_doctor_account(&request).await {
                    Ok(()) => {
                        info!("Assigned account {} to doctor {}", request.username, doctor_id);
                        self.state.close_dialog();
                        self.state.inform(MSG_ASSIGNED);
                        true
                    }
                    Err(e) => {
                        warn!("Failed to assign account: {}", e);
                        self.state.alert(loaders::user_message(&e, MSG_ASSIGN_FAILED));
                        false
                    }
                }
            }
            Dialog::MyProfile { draft } => self.submit_my_profile(draft).await,
            Dialog::Registration { mode, draft } => {
                let action = if mode.editing_id().is_some() {
                    Action::EditRegistration
                } else {
                    Action::CreateRegistration
                };
                if !self.guard(action) {
                    return false;
                }
                match draft.validate(&mode) {
                    Ok(payload) => {
                        self.save_entity::<Registration, _>(
                            Entity::Registration,
                            mode.editing_id(),
                            &payload,
                        )
                        .await
                    }
                    Err(e) => self.reject(e),
                }
            }
        }
    }

    /// 保存本人档案，重新获取账号信息后继续打开挂号对话框
    async fn submit_my_profile(&mut self, draft: PatientDraft) -> bool {
        let payload = match draft.validate() {
            Ok(payload) => payload,
            Err(e) => return self.reject(e),
        };
        if let Err(e) = self.client.upsert_my_patient_profile(&payload).await {
            warn!("Failed to save own patient profile: {}", e);
            self.state.alert(loaders::user_message(&e, loaders::MSG_SAVE_FAILED));
            return false;
        }
        self.state.close_dialog();

        if !self.session.refresh_identity(&mut self.client).await {
            warn!("Identity refresh failed after profile update");
            self.state.reset_data();
            self.show(Page::Login);
            return false;
        }
        self.open_registration_dialog(None).await;
        true
    }

    fn reject(&mut self, err: HospitalError) -> bool {
        debug!("Validation failed: {}", err);
        self.state.alert(err.to_string());
        false
    }
}
