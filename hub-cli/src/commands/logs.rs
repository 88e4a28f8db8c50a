use crate::app::CliApp;
use crate::cli::LogsCommand;
use hub_core::error::Result;
use hub_core::logger::{ExportFormat, LogLevel};
use tracing::{error, info, warn};

/// 分发日志子命令
pub async fn run_logs_command(app: &CliApp, cmd: LogsCommand) -> Result<()> {
    match cmd {
        LogsCommand::Show {
            category,
            lines,
            level,
        } => run_show(app, &category, lines, level.as_deref()),
        LogsCommand::Stats { category, hours } => run_stats(app, &category, hours),
        LogsCommand::Export {
            category,
            format,
            lines,
        } => run_export(app, &category, &format, lines),
        LogsCommand::Clean { days } => run_clean(app, days),
    }
}

/// 查看最近日志
fn run_show(app: &CliApp, category: &str, lines: usize, level: Option<&str>) -> Result<()> {
    let level_filter = match level {
        Some(raw) => match LogLevel::parse(raw) {
            Some(level) => Some(level),
            None => {
                error!("❌ 无效的日志级别: {raw}");
                info!("💡 可用级别: debug, info, warning, error, critical");
                return Ok(());
            }
        },
        None => None,
    };

    let entries = app.log_writer.get_logs(category, lines, level_filter);
    if entries.is_empty() {
        info!("📋 分类 '{category}' 暂无日志");
        return Ok(());
    }

    info!("📋 日志: {category}（最新的在前，共 {} 条）", entries.len());
    info!("{}", "-".repeat(90));
    for entry in &entries {
        let context = if entry.context.is_empty() {
            String::new()
        } else {
            format!(" {}", serde_json::to_string(&entry.context).unwrap_or_default())
        };
        info!(
            "[{}] {}: {}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.level.as_str(),
            entry.message,
            context
        );
    }

    Ok(())
}

/// 日志统计
fn run_stats(app: &CliApp, category: &str, hours: u32) -> Result<()> {
    let stats = app.log_writer.get_log_stats(category, hours);

    info!("📊 日志统计: {category}");
    info!("================");
    info!("   总条数: {}", stats.total);
    info!("   DEBUG: {}", stats.debug);
    info!("   INFO: {}", stats.info);
    info!("   WARNING: {}", stats.warning);
    info!("   ERROR: {}", stats.error);
    info!("   CRITICAL: {}", stats.critical);

    if stats.recent_errors > 0 {
        warn!("⚠️  最近 {hours} 小时内有 {} 条错误日志", stats.recent_errors);
    } else {
        info!("✅ 最近 {hours} 小时内没有错误日志");
    }

    Ok(())
}

/// 导出日志到标准输出
fn run_export(app: &CliApp, category: &str, format: &str, lines: usize) -> Result<()> {
    let format = match ExportFormat::parse(format) {
        Some(format) => format,
        None => {
            error!("❌ 无效的导出格式: {format}");
            return Ok(());
        }
    };

    // 数据输出直接写标准输出，与日志流分离
    print!("{}", app.log_writer.export_logs(category, format, lines));
    Ok(())
}

/// 清理过期日志文件
fn run_clean(app: &CliApp, days: u32) -> Result<()> {
    info!("🧹 清理超过 {days} 天的日志文件...");

    let removed = app.log_writer.clean_old_logs(days);
    if removed == 0 {
        info!("✅ 没有超过保留期的日志文件");
    } else {
        info!("✅ 已删除 {removed} 个过期日志文件");
    }

    Ok(())
}
