use pve_backup_core::constants::config::LOG_FILE_ENV;

/// 设置日志记录系统
///
/// 标准输出只留给监控系统读取的状态行，日志一律写到 stderr 或文件：
/// - 默认只输出 warn 及以上，`-d` 打开 debug
/// - `RUST_LOG` 优先于上面的默认级别
/// - 设置 `CHECK_PVE_BACKUP_LOG_FILE` 时写入文件，格式更详细
pub fn setup_logging(debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if debug { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_file = std::env::var(LOG_FILE_ENV).ok().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| eprintln!("无法打开日志文件 {path}: {e}"))
            .ok()
    });

    if let Some(file) = log_file {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
            .init();
    } else {
        // 终端输出使用简洁格式
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_line_number(false)
            .without_time()
            .compact()
            .init();
    }
}
