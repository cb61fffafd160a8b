//! 数据加载与保存
//!
//! 每类实体一个加载函数：成功时替换缓存，失败时保留旧数据并标记错误，
//! 不向调用方返回错误。医生依赖病种名称，挂号依赖病人与医生名称，
//! 依赖缓存为空时先加载依赖，不为空时不强制刷新。

use hospital_client::{ApiClient, Resource};
use hospital_core::{Disease, Doctor, HospitalError, Patient, Registration, Role};
use serde::Serialize;
use tracing::{info, warn};

use crate::state::{AppState, Cache};

pub const MSG_SAVE_FAILED: &str = "保存失败";
pub const MSG_DELETE_FAILED: &str = "删除失败";

/// 交互式确认
pub trait Prompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

/// 固定应答的确认实现
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Prompt for AutoConfirm {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

/// 删除确认文案
pub fn delete_confirmation<R: Resource>() -> &'static str {
    match R::COLLECTION {
        "patients" => "确定要删除这个病人吗？此操作不可恢复。",
        "diseases" => "确定要删除这个病种吗？此操作不可恢复。",
        "doctors" => "确定要删除这个医生吗？此操作不可恢复。",
        _ => "确定要删除这个挂号记录吗？此操作不可恢复。",
    }
}

/// 后端错误转换为展示文案：取后端消息，否则使用默认文案
pub fn user_message(err: &HospitalError, fallback: &str) -> String {
    match err {
        HospitalError::Api { message, .. } if !message.is_empty() => message.clone(),
        HospitalError::Validation(message) | HospitalError::Permission(message) => message.clone(),
        _ => fallback.to_string(),
    }
}

async fn load_into<R: Resource>(client: &ApiClient, cache: &mut Cache<R>) -> bool {
    match client.list::<R>().await {
        Ok(items) => {
            info!("Loaded {} {}", items.len(), R::COLLECTION);
            cache.replace(items);
            true
        }
        Err(e) => {
            warn!("Failed to load {}: {}", R::COLLECTION, e);
            cache.fail();
            false
        }
    }
}

pub async fn load_patients(client: &ApiClient, state: &mut AppState) -> bool {
    load_into::<Patient>(client, &mut state.patients).await
}

pub async fn load_diseases(client: &ApiClient, state: &mut AppState) -> bool {
    load_into::<Disease>(client, &mut state.diseases).await
}

pub async fn load_doctors(client: &ApiClient, state: &mut AppState) -> bool {
    if state.diseases.is_empty() {
        load_diseases(client, state).await;
    }
    load_into::<Doctor>(client, &mut state.doctors).await
}

/// 病人账号无权列出病人，清空病人缓存
pub async fn ensure_patients(client: &ApiClient, state: &mut AppState, role: Option<Role>) {
    match role {
        Some(Role::Patient) => state.patients.clear(),
        _ if state.patients.is_empty() => {
            load_patients(client, state).await;
        }
        _ => {}
    }
}

pub async fn ensure_doctors(client: &ApiClient, state: &mut AppState) {
    if state.doctors.is_empty() {
        load_doctors(client, state).await;
    }
}

pub async fn load_registrations(
    client: &ApiClient,
    state: &mut AppState,
    role: Option<Role>,
) -> bool {
    ensure_patients(client, state, role).await;
    ensure_doctors(client, state).await;
    load_into::<Registration>(client, &mut state.registrations).await
}

/// 新增（`id` 为空）或更新
pub async fn save<R: Resource, B: Serialize + Sync>(
    client: &ApiClient,
    id: Option<&str>,
    body: &B,
) -> Result<(), String> {
    let result = match id {
        Some(id) => client.update::<R, _>(id, body).await,
        None => client.create::<R, _>(body).await,
    };
    result.map_err(|e| {
        warn!("Failed to save {}: {}", R::SINGULAR, e);
        user_message(&e, MSG_SAVE_FAILED)
    })
}

/// 确认后删除；用户取消时返回 `Ok(false)`，不发请求
pub async fn remove<R: Resource>(
    client: &ApiClient,
    prompt: &dyn Prompt,
    id: &str,
) -> Result<bool, String> {
    if !prompt.confirm(delete_confirmation::<R>()) {
        return Ok(false);
    }
    client.delete::<R>(id).await.map_err(|e| {
        warn!("Failed to delete {} {}: {}", R::SINGULAR, id, e);
        user_message(&e, MSG_DELETE_FAILED)
    })?;
    info!("Deleted {} {}", R::SINGULAR, id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MSG_LOAD_FAILED;
    use hospital_client::mock::ScriptedTransport;
    use hospital_client::HttpMethod;
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> (Arc<ScriptedTransport>, ApiClient) {
        let transport = Arc::new(ScriptedTransport::new());
        let client = ApiClient::new(transport.clone());
        (transport, client)
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_items() {
        let (transport, client) = client();
        transport
            .respond(
                HttpMethod::Get,
                "/api/patients/getPatients",
                200,
                json!([{"id": "p1", "name": "王五"}]),
            )
            .respond(HttpMethod::Get, "/api/patients/getPatients", 500, json!({}));
        let mut state = AppState::default();

        assert!(load_patients(&client, &mut state).await);
        assert!(!load_patients(&client, &mut state).await);
        assert_eq!(state.patients.items.len(), 1);
        assert_eq!(state.patients.error.as_deref(), Some(MSG_LOAD_FAILED));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_failure() {
        let (transport, client) = client();
        transport.respond_text(HttpMethod::Get, "/api/diseases/getDiseases", 200, "<html>");
        let mut state = AppState::default();

        assert!(!load_diseases(&client, &mut state).await);
        assert!(state.diseases.error.is_some());
    }

    #[tokio::test]
    async fn test_doctors_load_diseases_only_when_empty() {
        let (transport, client) = client();
        transport
            .respond(
                HttpMethod::Get,
                "/api/diseases/getDiseases",
                200,
                json!([{"id": "x1", "name": "感冒", "category": "内科"}]),
            )
            .respond(HttpMethod::Get, "/api/doctors/getDoctors", 200, json!([]));
        let mut state = AppState::default();

        load_doctors(&client, &mut state).await;
        load_doctors(&client, &mut state).await;
        assert_eq!(transport.calls(HttpMethod::Get, "/api/diseases/getDiseases"), 1);
        assert_eq!(transport.calls(HttpMethod::Get, "/api/doctors/getDoctors"), 2);
    }

    #[tokio::test]
    async fn test_patient_role_skips_patient_list() {
        let (transport, client) = client();
        transport
            .respond(HttpMethod::Get, "/api/diseases/getDiseases", 200, json!([]))
            .respond(HttpMethod::Get, "/api/doctors/getDoctors", 200, json!([]))
            .respond(
                HttpMethod::Get,
                "/api/registrations/getRegistrations",
                200,
                json!([{"id": "r1", "patientId": "p1", "status": "pending"}]),
            );
        let mut state = AppState::default();
        state.patients.replace(vec![Patient::default()]);

        assert!(load_registrations(&client, &mut state, Some(Role::Patient)).await);
        assert!(state.patients.is_empty());
        assert_eq!(transport.calls(HttpMethod::Get, "/api/patients/getPatients"), 0);
        assert_eq!(state.registrations.items.len(), 1);
    }

    #[tokio::test]
    async fn test_save_surfaces_backend_message() {
        let (transport, client) = client();
        transport.respond(
            HttpMethod::Post,
            "/api/patients/createPatient",
            409,
            json!({"error": "身份证号已存在"}),
        );

        let err = save::<Patient, _>(&client, None, &json!({})).await.unwrap_err();
        assert_eq!(err, "身份证号已存在");
    }

    #[tokio::test]
    async fn test_save_falls_back_on_network_error() {
        let (transport, client) = client();
        transport.fail(HttpMethod::Put, "/api/diseases/updateDisease", "refused");

        let err = save::<Disease, _>(&client, Some("x1"), &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, MSG_SAVE_FAILED);
    }

    #[tokio::test]
    async fn test_remove_requires_confirmation() {
        let (transport, client) = client();
        transport.respond(
            HttpMethod::Delete,
            "/api/doctors/deleteDoctor",
            500,
            json!({}),
        );

        assert_eq!(remove::<Doctor>(&client, &AutoConfirm(false), "d1").await, Ok(false));
        assert!(transport.requests().is_empty());

        let err = remove::<Doctor>(&client, &AutoConfirm(true), "d1").await.unwrap_err();
        assert_eq!(err, MSG_DELETE_FAILED);
        assert_eq!(transport.requests()[0].query[0].1, "d1");
    }
}
