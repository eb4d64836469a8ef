use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Current calendar date in UTC, matching how activity dates are stored.
pub fn today_utc() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}

/// RFC 3339 timestamp attached to AI responses.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// 初始化日志
pub fn init_log(log: Option<PathBuf>) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("luno_server=debug,tower_http=info,sqlx=warn"));
    let subscriber_builder = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true);
    let (non_blocking, guard) = if let Some(log) = log {
        // output to file，daily rotate, non-blocking
        std::fs::create_dir_all(&log).expect("create log directory failed");
        let file_appender = tracing_appender::rolling::daily(log, "luno_server.log");
        tracing_appender::non_blocking(file_appender)
    } else {
        // output to stdout
        tracing_appender::non_blocking(std::io::stdout())
    };
    tracing::subscriber::set_global_default(
        subscriber_builder.with_writer(non_blocking).finish(),
    )
    .expect("init log failed");
    guard
}
