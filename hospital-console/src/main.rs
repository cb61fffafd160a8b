//! 挂号系统命令行客户端
//!
//! 连接后端，恢复或建立会话，进入指定页面并输出渲染后的HTML。

use clap::Parser;
use hospital_app::{App, AppConfig, AutoConfirm, Notice};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 命令行参数，未指定的项取自配置文件与环境变量
#[derive(Parser, Debug)]
#[command(name = "hospital-console")]
#[command(about = "医院挂号系统命令行客户端")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 后端地址，例如 http://localhost:8080
    #[arg(short, long)]
    base_url: Option<String>,

    /// 令牌保存目录；不指定则只在本次运行中保留
    #[arg(short, long)]
    state_dir: Option<PathBuf>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,

    /// 登录账号
    #[arg(short, long)]
    username: Option<String>,

    /// 登录密码
    #[arg(short, long)]
    password: Option<String>,

    /// 要进入的页面，例如 #registrations
    #[arg(long, default_value = "")]
    page: String,

    /// 退出登录并清除保存的令牌
    #[arg(long)]
    logout: bool,

    /// 删除确认一律回答"是"
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(base_url) = &args.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(state_dir) = &args.state_dir {
        config.session.state_dir = Some(state_dir.clone());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    // 初始化日志，RUST_LOG 优先
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("启动挂号系统客户端...");

    let mut app = App::from_config(&config, Arc::new(AutoConfirm(args.yes)))?;

    if args.logout {
        app.logout();
    } else if let (Some(username), Some(password)) = (&args.username, &args.password) {
        if !app.login_to(username, password, &args.page).await {
            let reason = app.state().login_error.as_deref().unwrap_or_default();
            warn!("登录失败: {}", reason);
        }
    } else {
        app.start(&args.page).await;
    }

    let html = match app.render() {
        Ok(html) => html,
        Err(e) => {
            error!("渲染失败: {}", e);
            return Err(e.into());
        }
    };
    println!("{}", html);

    for notice in app.take_notices() {
        match notice {
            Notice::Info(message) => info!("{}", message),
            Notice::Error(message) => warn!("{}", message),
        }
    }

    Ok(())
}
