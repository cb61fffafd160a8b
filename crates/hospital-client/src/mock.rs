//! 脚本化传输实现
//!
//! 按 (方法, 路径) 预置响应并记录所有请求，用于测试与离线演示。
//! 同一路由预置多个响应时依次返回，最后一个会被重复使用。

use async_trait::async_trait;
use hospital_core::{HospitalError, Result};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::transport::{ApiRequest, ApiResponse, HttpMethod, Transport};

#[derive(Debug, Clone)]
enum Scripted {
    Response(ApiResponse),
    NetworkError(String),
}

#[derive(Default)]
struct Script {
    routes: HashMap<(HttpMethod, String), VecDeque<Scripted>>,
    fallback: VecDeque<Scripted>,
    log: Vec<ApiRequest>,
}

/// 预置响应的传输实现
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

fn json_response(status: u16, body: &Value) -> ApiResponse {
    ApiResponse {
        status,
        content_type: Some("application/json; charset=utf-8".to_string()),
        body: body.to_string(),
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 为指定路由追加一个JSON响应
    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> &Self {
        self.route(method, path, Scripted::Response(json_response(status, &body)))
    }

    /// 为指定路由追加一个纯文本响应
    pub fn respond_text(&self, method: HttpMethod, path: &str, status: u16, body: &str) -> &Self {
        let response = ApiResponse {
            status,
            content_type: Some("text/plain; charset=utf-8".to_string()),
            body: body.to_string(),
        };
        self.route(method, path, Scripted::Response(response))
    }

    /// 指定路由返回网络错误
    pub fn fail(&self, method: HttpMethod, path: &str, message: &str) -> &Self {
        self.route(method, path, Scripted::NetworkError(message.to_string()))
    }

    /// 未匹配路由时按顺序使用的JSON响应
    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.script()
            .fallback
            .push_back(Scripted::Response(json_response(status, &body)));
        self
    }

    fn route(&self, method: HttpMethod, path: &str, scripted: Scripted) -> &Self {
        self.script()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
        self
    }

    /// 已发送的全部请求
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.script().log.clone()
    }

    /// 某路由被调用的次数
    pub fn calls(&self, method: HttpMethod, path: &str) -> usize {
        self.script()
            .log
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.script().log.clear();
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut script = self.script();
        let key = (request.method, request.path.clone());
        script.log.push(request);

        let scripted = match script.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        let scripted = scripted.or_else(|| script.fallback.pop_front());

        match scripted {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::NetworkError(message)) => Err(HospitalError::Network(message)),
            None => Ok(json_response(
                404,
                &serde_json::json!({ "error": format!("未配置的接口: {} {}", key.0, key.1) }),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_route_queue_repeats_last() {
        let transport = ScriptedTransport::new();
        transport
            .respond(HttpMethod::Get, "/a", 200, json!(1))
            .respond(HttpMethod::Get, "/a", 200, json!(2));

        let first = transport.send(ApiRequest::new(HttpMethod::Get, "/a")).await.unwrap();
        let second = transport.send(ApiRequest::new(HttpMethod::Get, "/a")).await.unwrap();
        let third = transport.send(ApiRequest::new(HttpMethod::Get, "/a")).await.unwrap();
        assert_eq!(first.body, "1");
        assert_eq!(second.body, "2");
        assert_eq!(third.body, "2");
        assert_eq!(transport.calls(HttpMethod::Get, "/a"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_is_404() {
        let transport = ScriptedTransport::new();
        let response = transport
            .send(ApiRequest::new(HttpMethod::Delete, "/missing"))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_network_failure() {
        let transport = ScriptedTransport::new();
        transport.fail(HttpMethod::Get, "/down", "connection refused");
        let err = transport
            .send(ApiRequest::new(HttpMethod::Get, "/down"))
            .await
            .unwrap_err();
        assert!(matches!(err, HospitalError::Network(_)));
    }
}
