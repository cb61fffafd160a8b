//! 病人挂号流程演示程序
//!
//! 病人账号首次挂号时先完善个人信息，保存后继续填写挂号

use hospital_app::{App, AppConfig, AutoConfirm, Dialog};
use hospital_client::mock::ScriptedTransport;
use hospital_client::{HttpMethod, MemoryTokenStore};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🏥 病人挂号流程演示");
    println!("================================");

    let transport = Arc::new(ScriptedTransport::new());
    // 首次查询尚未关联档案，保存档案后返回关联ID
    let me_unlinked = json!({"id": "u9", "username": "zhaoliu", "role": "patient"});
    let me_linked = json!({"id": "u9", "username": "zhaoliu", "role": "patient", "linkedId": "p9"});
    let doctors = json!([{"id": "d1", "name": "张医生", "department": "内科"}]);
    transport
        .respond(
            HttpMethod::Post,
            "/api/auth/login",
            200,
            json!({"token": "t-patient"}),
        )
        .respond(HttpMethod::Get, "/api/auth/me", 200, me_unlinked)
        .respond(HttpMethod::Get, "/api/auth/me", 200, me_linked)
        .respond(
            HttpMethod::Post,
            "/api/auth/upsertMyPatientProfile",
            200,
            json!({}),
        )
        .respond(HttpMethod::Get, "/api/diseases/getDiseases", 200, json!([]))
        .respond(HttpMethod::Get, "/api/doctors/getDoctors", 200, doctors)
        .respond(
            HttpMethod::Get,
            "/api/registrations/getRegistrations",
            200,
            json!([]),
        )
        .respond(
            HttpMethod::Post,
            "/api/registrations/createRegistration",
            200,
            json!({}),
        );

    let mut app = App::new(
        &AppConfig::default(),
        transport.clone(),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(AutoConfirm(true)),
    );

    println!("\n🔐 登录...");
    app.start("").await;
    if !app.login("zhaoliu", "secret").await {
        anyhow::bail!("登录失败: {:?}", app.state().login_error);
    }
    println!("  当前页面: {}", app.state().page.title());

    println!("\n📝 新增挂号...");
    app.open_create_registration().await;
    if let Some(Dialog::MyProfile { draft }) = app.dialog_mut() {
        println!("  尚未关联病人档案，先完善个人信息");
        draft.name = "赵六".to_string();
        draft.gender = "女".to_string();
        draft.age = "28".to_string();
        draft.phone = "13700000000".to_string();
        draft.id_card = "110101199601011234".to_string();
        draft.address = "天津市和平区".to_string();
        draft.emergency_contact = "赵七".to_string();
    }
    app.submit_dialog().await;

    if let Some(Dialog::Registration { draft, .. }) = app.dialog_mut() {
        println!("  档案已保存，继续填写挂号信息");
        draft.visit_date = "2030-01-15".to_string();
        draft.time_slot = "09:00-10:00".to_string();
        draft.symptoms = "咳嗽三天".to_string();
    }
    app.select_registration_doctor("d1");
    if app.submit_dialog().await {
        println!("  ✅ 挂号已提交");
    }

    for notice in app.take_notices() {
        println!("  ⚠️ {}", notice.message());
    }

    println!("\n📨 请求记录");
    for request in transport.requests() {
        println!("  {} {}", request.method, request.path);
    }

    println!("\n✅ 演示完成！");
    Ok(())
}
