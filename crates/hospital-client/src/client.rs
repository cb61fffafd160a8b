//! 后端REST接口客户端
//!
//! 为认证、四类实体的增删改查以及首页概览提供类型化调用。
//! 非2xx响应统一转换为 `HospitalError::Api`，其消息按
//! [`extract_error_message`] 的规则从响应体中提取。

use hospital_core::{
    Disease, Doctor, HospitalError, Identity, IndexSnapshot, Patient, Registration, Result, Role,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::transport::{ApiRequest, ApiResponse, HttpMethod, Transport};

/// 默认API前缀
pub const DEFAULT_API_PREFIX: &str = "/api";
/// 首页概览接口（不在API前缀下）
pub const DEFAULT_INDEX_PATH: &str = "/index/";

/// 可通过标准CRUD接口访问的实体
///
/// 路径形如 `/patients/getPatients`、`/patients/updatePatient?id=...`
pub trait Resource: DeserializeOwned + Send + 'static {
    const COLLECTION: &'static str;
    const SINGULAR: &'static str;
    const PLURAL: &'static str;
}

impl Resource for Patient {
    const COLLECTION: &'static str = "patients";
    const SINGULAR: &'static str = "Patient";
    const PLURAL: &'static str = "Patients";
}

impl Resource for Disease {
    const COLLECTION: &'static str = "diseases";
    const SINGULAR: &'static str = "Disease";
    const PLURAL: &'static str = "Diseases";
}

impl Resource for Doctor {
    const COLLECTION: &'static str = "doctors";
    const SINGULAR: &'static str = "Doctor";
    const PLURAL: &'static str = "Doctors";
}

impl Resource for Registration {
    const COLLECTION: &'static str = "registrations";
    const SINGULAR: &'static str = "Registration";
    const PLURAL: &'static str = "Registrations";
}

/// 登录请求
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// 分配医生账号请求
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAccountRequest {
    pub doctor_id: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

/// `/auth/me` 原始响应，字段可能缺失
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    id: Option<String>,
    username: Option<String>,
    role: Option<String>,
    linked_id: Option<String>,
}

impl MeResponse {
    fn into_identity(self) -> Option<Identity> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let role = self.role.as_deref().and_then(Role::parse)?;
        Some(Identity {
            id,
            username: self.username.filter(|u| !u.is_empty()),
            role,
            linked_id: self.linked_id.filter(|l| !l.is_empty()),
        })
    }
}

/// 从错误响应中提取可读消息
///
/// JSON响应取 `error` 或 `message` 字段；文本响应先尝试按JSON解析，
/// 否则返回原文；都没有时返回 `fallback`。
pub fn extract_error_message(response: &ApiResponse, fallback: &str) -> String {
    let is_json = response
        .content_type
        .as_deref()
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    let from_json = |value: &Value| -> Option<String> {
        ["error", "message"].iter().find_map(|key| {
            value
                .get(*key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|msg| !msg.is_empty())
                .map(str::to_string)
        })
    };

    if is_json {
        return serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|v| from_json(&v))
            .unwrap_or_else(|| fallback.to_string());
    }

    if response.body.is_empty() {
        return fallback.to_string();
    }

    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|v| from_json(&v))
        .unwrap_or_else(|| response.body.clone())
}

/// 列表接口响应：非数组（包括 null）视为空集合
fn parse_collection<R: DeserializeOwned>(response: &ApiResponse) -> Result<Vec<R>> {
    let value: Value = response.json()?;
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        _ => Ok(Vec::new()),
    }
}

/// 首页概览响应：可能是单元素数组，也可能是对象；缺失或非数组的成员视为空
fn parse_index_snapshot(response: &ApiResponse) -> Result<IndexSnapshot> {
    let value: Value = response.json()?;
    let info = match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Object(_) => value,
        _ => return Ok(IndexSnapshot::default()),
    };

    let member = |key: &str| match info.get(key) {
        Some(v @ Value::Array(_)) => v.clone(),
        _ => Value::Array(Vec::new()),
    };

    Ok(IndexSnapshot {
        patients: serde_json::from_value(member("patients"))?,
        doctors: serde_json::from_value(member("doctors"))?,
        registrations: serde_json::from_value(member("registrations"))?,
    })
}

/// 后端客户端
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    prefix: String,
    index_path: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            prefix: DEFAULT_API_PREFIX.to_string(),
            index_path: DEFAULT_INDEX_PATH.to_string(),
            token: None,
        }
    }

    /// 自定义API前缀与首页概览路径
    pub fn with_paths(mut self, prefix: &str, index_path: &str) -> Self {
        self.prefix = prefix.trim_end_matches('/').to_string();
        self.index_path = index_path.to_string();
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: HttpMethod, path: &str) -> ApiRequest {
        ApiRequest::new(method, format!("{}{}", self.prefix, path)).bearer(self.token())
    }

    fn resource_path<R: Resource>(verb: &str, noun: &str) -> String {
        format!("/{}/{}{}", R::COLLECTION, verb, noun)
    }

    /// 发送请求，非2xx转换为带可读消息的错误
    async fn execute(&self, request: ApiRequest, fallback: &str) -> Result<ApiResponse> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.send(request).await?;

        if response.is_success() {
            debug!("{} {} -> {}", method, path, response.status);
            return Ok(response);
        }

        let message = extract_error_message(&response, fallback);
        warn!("{} {} -> {}: {}", method, path, response.status, message);
        Err(HospitalError::Api {
            status: response.status,
            message,
        })
    }

    /// 登录，返回令牌
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let body = serde_json::to_value(LoginRequest { username, password })?;
        let request = self.request(HttpMethod::Post, "/auth/login").json(body);
        let response = self.execute(request, "登录失败").await?;

        let parsed: LoginResponse = response.json()?;
        match parsed.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                info!("Login succeeded for user: {}", username);
                Ok(token)
            }
            None => Err(HospitalError::Unauthenticated),
        }
    }

    /// 获取当前账号信息；缺少 id 或 role 视为未登录
    pub async fn me(&self) -> Result<Identity> {
        if self.token.is_none() {
            return Err(HospitalError::Unauthenticated);
        }
        let request = self.request(HttpMethod::Get, "/auth/me");
        let response = self.execute(request, "未登录").await?;
        let me: MeResponse = response.json()?;
        me.into_identity().ok_or(HospitalError::Unauthenticated)
    }

    /// 为医生分配登录账号
    pub async fn assign_doctor_account(&self, body: &AssignAccountRequest) -> Result<()> {
        let request = self
            .request(HttpMethod::Post, "/auth/assignDoctorAccount")
            .json(serde_json::to_value(body)?);
        self.execute(request, "分配失败").await?;
        Ok(())
    }

    /// 病人账号创建或更新本人档案
    pub async fn upsert_my_patient_profile<B: Serialize + Sync>(&self, body: &B) -> Result<()> {
        let request = self
            .request(HttpMethod::Post, "/auth/upsertMyPatientProfile")
            .json(serde_json::to_value(body)?);
        self.execute(request, "保存失败").await?;
        Ok(())
    }

    /// 获取实体全集
    pub async fn list<R: Resource>(&self) -> Result<Vec<R>> {
        let path = Self::resource_path::<R>("get", R::PLURAL);
        let response = self
            .execute(self.request(HttpMethod::Get, &path), "加载失败")
            .await?;
        parse_collection(&response)
    }

    pub async fn create<R: Resource, B: Serialize + Sync>(&self, body: &B) -> Result<()> {
        let path = Self::resource_path::<R>("create", R::SINGULAR);
        let request = self
            .request(HttpMethod::Post, &path)
            .json(serde_json::to_value(body)?);
        self.execute(request, "保存失败").await?;
        Ok(())
    }

    pub async fn update<R: Resource, B: Serialize + Sync>(&self, id: &str, body: &B) -> Result<()> {
        let path = Self::resource_path::<R>("update", R::SINGULAR);
        let request = self
            .request(HttpMethod::Put, &path)
            .query("id", id)
            .json(serde_json::to_value(body)?);
        self.execute(request, "保存失败").await?;
        Ok(())
    }

    pub async fn delete<R: Resource>(&self, id: &str) -> Result<()> {
        let path = Self::resource_path::<R>("delete", R::SINGULAR);
        let request = self.request(HttpMethod::Delete, &path).query("id", id);
        self.execute(request, "删除失败").await?;
        Ok(())
    }

    /// 首页概览（病人、医生、挂号全集）
    pub async fn index_snapshot(&self) -> Result<IndexSnapshot> {
        let request =
            ApiRequest::new(HttpMethod::Get, self.index_path.clone()).bearer(self.token());
        let response = self.execute(request, "加载首页概览失败").await?;
        parse_index_snapshot(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedTransport;
    use serde_json::json;

    fn response(status: u16, content_type: Option<&str>, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_extract_error_message() {
        let json_ct = Some("application/json; charset=utf-8");
        assert_eq!(
            extract_error_message(&response(400, json_ct, r#"{"error":" 身份证号重复 "}"#), "保存失败"),
            "身份证号重复"
        );
        assert_eq!(
            extract_error_message(&response(400, json_ct, r#"{"message":"bad"}"#), "保存失败"),
            "bad"
        );
        assert_eq!(
            extract_error_message(&response(400, json_ct, r#"{"error":""}"#), "保存失败"),
            "保存失败"
        );
        assert_eq!(
            extract_error_message(&response(500, json_ct, "oops"), "保存失败"),
            "保存失败"
        );
        assert_eq!(
            extract_error_message(&response(500, Some("text/plain"), r#"{"error":"x"}"#), "f"),
            "x"
        );
        assert_eq!(
            extract_error_message(&response(502, Some("text/plain"), "Bad Gateway"), "f"),
            "Bad Gateway"
        );
        assert_eq!(extract_error_message(&response(500, None, ""), "删除失败"), "删除失败");
    }

    #[tokio::test]
    async fn test_list_treats_null_as_empty() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, json!(null));
        let client = ApiClient::new(transport.clone());

        let patients: Vec<Patient> = client.list().await.unwrap();
        assert!(patients.is_empty());
        assert_eq!(transport.requests()[0].path, "/api/patients/getPatients");
    }

    #[tokio::test]
    async fn test_update_uses_query_id_and_bearer() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, json!({"ok": true}));
        let mut client = ApiClient::new(transport.clone());
        client.set_token(Some("tok".to_string()));

        client
            .update::<Doctor, _>("d 1", &json!({"name": "李医生"}))
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.path, "/api/doctors/updateDoctor");
        assert_eq!(sent.query, vec![("id".to_string(), "d 1".to_string())]);
        assert_eq!(sent.bearer.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_me_rejects_missing_role() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, json!({"id": "a1", "role": ""}));
        let mut client = ApiClient::new(transport);
        client.set_token(Some("tok".to_string()));

        assert!(matches!(client.me().await, Err(HospitalError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_me_maps_linked_id() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(
            200,
            json!({"id": "a1", "username": "zhang", "role": "patient", "linkedId": ""}),
        );
        let mut client = ApiClient::new(transport);
        client.set_token(Some("tok".to_string()));

        let me = client.me().await.unwrap();
        assert_eq!(me.role, Role::Patient);
        assert!(me.linked_id.is_none());
    }

    #[tokio::test]
    async fn test_login_error_message() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(401, json!({"error": "密码错误"}));
        let client = ApiClient::new(transport);

        let err = client.login("admin", "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "密码错误");
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_index_snapshot_unwraps_array() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(
            200,
            json!([{
                "patients": [{"id": "p1", "name": "王五", "gender": "男"}],
                "doctors": null,
                "registrations": [{"id": "r1", "status": "pending"}]
            }]),
        );
        let client = ApiClient::new(transport.clone());

        let snapshot = client.index_snapshot().await.unwrap();
        assert_eq!(snapshot.patients.len(), 1);
        assert!(snapshot.doctors.is_empty());
        assert_eq!(snapshot.registrations.len(), 1);
        assert_eq!(transport.requests()[0].path, "/index/");
    }
}
