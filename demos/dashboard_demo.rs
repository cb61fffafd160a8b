//! 首页概览与统计报表演示程序
//!
//! 使用预置响应模拟后端，以管理员身份查看首页与统计报表

use chrono::{Duration, Utc};
use hospital_app::{App, AppConfig, AutoConfirm, Page};
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

    println!("🏥 挂号系统首页演示");
    println!("================================");

    let now = Utc::now();
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .respond(
            HttpMethod::Get,
            "/api/auth/me",
            200,
            json!({"id": "a1", "username": "admin", "role": "admin"}),
        )
        .respond(
            HttpMethod::Get,
            "/api/diseases/getDiseases",
            200,
            json!([
                {"id": "x1", "name": "感冒", "category": "内科"},
                {"id": "x2", "name": "骨折", "category": "外科"}
            ]),
        )
        .respond(
            HttpMethod::Get,
            "/index/",
            200,
            json!([{
                "patients": [
                    {"id": "p1", "name": "王五", "createdAt": (now - Duration::minutes(40)).to_rfc3339()},
                    {"id": "p2", "name": "赵六", "createdAt": (now - Duration::days(2)).to_rfc3339()}
                ],
                "doctors": [
                    {"id": "d1", "name": "张医生", "department": "内科"},
                    {"id": "d2", "name": "李医生", "department": "外科"}
                ],
                "registrations": [
                    {"id": "r1", "patientId": "p1", "doctorId": "d1", "status": "pending",
                     "departments": ["内科"], "registrationDate": (now - Duration::minutes(5)).to_rfc3339()},
                    {"id": "r2", "patientId": "p2", "doctorId": "d2", "status": "confirmed",
                     "registrationDate": (now - Duration::hours(3)).to_rfc3339()}
                ]
            }]),
        );

    let mut app = App::new(
        &AppConfig::default(),
        transport.clone(),
        Arc::new(MemoryTokenStore::with_token("demo-token")),
        Arc::new(AutoConfirm(true)),
    );

    println!("\n🔐 恢复会话...");
    let page = app.start("").await;
    println!("  当前页面: {}", page.title());

    if let Some(summary) = &app.state().dashboard.summary {
        println!("\n📊 首页统计");
        println!("  病人总数: {}", summary.patient_count);
        println!("  医生总数: {}", summary.doctor_count);
        println!("  病种总数: {}", summary.disease_count);
        println!("  今日挂号: {}", summary.today_registrations);
        println!(
            "  待确认 {} / 已确认 {} / 已完成 {} / 已取消 {}",
            summary.status.pending,
            summary.status.confirmed,
            summary.status.completed,
            summary.status.cancelled
        );
        println!("  {}", summary.updated_at);

        println!("\n🕒 最近动态");
        for activity in &summary.activities {
            println!("  - {} ({})", activity.text, activity.time);
        }
    }

    println!("\n📈 统计报表");
    app.navigate(&Page::Reports.hash()).await;
    if let Some(data) = &app.state().reports.data {
        for series in [&data.weekly, &data.departments] {
            println!("  {}", series.title);
            for (label, count) in series.points() {
                println!("    {}: {}", label, count);
            }
        }
    }

    println!("\n📨 共发送 {} 个请求", transport.requests().len());
    println!("\n✅ 演示完成！");
    Ok(())
}
