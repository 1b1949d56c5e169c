use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::structured_logger::{LogFormat, LoggingConfig};

/// 初始化日志，RUST_LOG 优先于配置中的级别
pub fn init_structured_logging(config: LoggingConfig) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location);

            registry
                .with(fmt_layer)
                .try_init()
                .context("初始化日志系统失败")?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location);

            registry
                .with(fmt_layer)
                .try_init()
                .context("初始化日志系统失败")?;
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false);

            registry
                .with(fmt_layer)
                .try_init()
                .context("初始化日志系统失败")?;
        }
    }

    info!(
        logging.format = ?config.format,
        logging.level = %config.level,
        "Structured logging initialized"
    );

    Ok(())
}

/// 安装Prometheus导出器，必须在Tokio运行时内调用
pub fn init_metrics(bind_address: &str) -> Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("无效的指标监听地址: {bind_address}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("安装Prometheus导出器失败")?;

    info!("Prometheus metrics exporter listening on {}", addr);
    Ok(())
}
