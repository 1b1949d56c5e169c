use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use calc_core::config::AppConfig;
use calc_infrastructure::{init_structured_logging, LogFormat, LoggingConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tracing::{error, info, warn};

mod app;
mod shutdown;

use app::{AppMode, Application};
use shutdown::ShutdownManager;

#[derive(Parser, Debug)]
#[command(name = "calc-scheduler")]
#[command(version)]
#[command(about = "分布式算术表达式计算调度系统")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 配置文件路径
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// 运行模式
    #[arg(short, long, value_enum, default_value_t = ModeArg::All)]
    mode: ModeArg,

    /// Worker ID (覆盖配置文件)
    #[arg(long, value_name = "ID")]
    worker_id: Option<String>,

    /// 日志级别 (覆盖配置文件)
    #[arg(short, long, value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// 日志格式 (覆盖配置文件)
    #[arg(long, value_name = "FORMAT", value_parser = ["json", "pretty", "compact"])]
    log_format: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 在本地直接计算表达式，不经过调度
    Eval {
        /// 表达式，如 "2*(3+4)-1"
        expression: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Orchestrator,
    Worker,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Eval { expression }) = &cli.command {
        return eval(expression);
    }

    let mut config = AppConfig::load(cli.config.as_deref()).with_context(|| {
        format!(
            "加载配置失败: {}",
            cli.config.as_deref().unwrap_or("<默认路径>")
        )
    })?;

    if let Some(id) = &cli.worker_id {
        config.worker.worker_id = id.clone();
    }
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.observability.log_format = format.clone();
    }

    init_structured_logging(LoggingConfig {
        level: config.observability.log_level.clone(),
        format: config
            .observability
            .log_format
            .parse::<LogFormat>()
            .map_err(|e| anyhow::anyhow!(e))?,
        include_location: false,
    })?;

    info!("启动分布式表达式计算系统");
    info!("运行模式: {:?}", cli.mode);

    let app_mode = parse_app_mode(cli.mode, &mut config)?;
    let app = Arc::new(Application::new(config, app_mode)?);
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown_manager.subscribe().await;

        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
            shutdown_manager.shutdown().await;

            match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
                Ok(Ok(Ok(()))) => info!("应用已优雅关闭"),
                Ok(Ok(Err(e))) => error!("应用运行失败: {e:#}"),
                Ok(Err(e)) => error!("应用关闭时发生错误: {e}"),
                Err(_) => warn!("应用关闭超时，强制退出"),
            }
        }
        joined = &mut app_handle => {
            // 组件自行退出（例如Worker遇到致命错误），不再等待信号
            shutdown_manager.shutdown().await;
            joined.context("应用任务异常退出")?.context("应用运行失败")?;
            info!("应用已退出");
        }
    }

    Ok(())
}

/// 本地求值，用于核对调度结果
fn eval(expression: &str) -> Result<()> {
    let tree = calc_domain::parse(expression).context("表达式无效")?;
    match tree.evaluate() {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(anyhow::anyhow!("计算失败: 除数为0")),
    }
}

/// 单组件模式会强制启用对应组件
fn parse_app_mode(mode: ModeArg, config: &mut AppConfig) -> Result<AppMode> {
    match mode {
        ModeArg::Orchestrator => {
            config.dispatcher.enabled = true;
            Ok(AppMode::Orchestrator)
        }
        ModeArg::Worker => {
            config.worker.enabled = true;
            config.worker.validate()?;
            Ok(AppMode::Worker)
        }
        ModeArg::All => {
            if !config.dispatcher.enabled && !config.worker.enabled {
                return Err(anyhow::anyhow!("调度端与Worker均被禁用，请检查配置"));
            }
            Ok(AppMode::All)
        }
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到Ctrl+C信号"),
        _ = terminate => info!("收到SIGTERM信号"),
    }
}
