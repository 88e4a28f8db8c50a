use crate::app::CliApp;
use crate::utils::format_size;
use hub_core::constants::logs;
use hub_core::error::Result;
use tracing::info;

/// 显示客户端版本信息（标题和基本信息）
pub fn show_client_version() {
    info!("🏫 Campus Hub 维护工具状态");
    info!("==========================");
    info!("📋 基本信息:");
    info!("   客户端版本: v{}", env!("CARGO_PKG_VERSION"));
    info!("   核心库版本: v{}", crate::project_info::version_info::CORE_VERSION);
}

/// 显示配置和备份/日志状态
pub async fn run_status(app: &CliApp) -> Result<()> {
    show_client_version();

    info!("   数据库: {}@{}:{}", app.config.database.name, app.config.database.host, app.config.database.port);
    info!("   备份目录: {}", app.config.get_backup_dir().display());
    info!("   日志目录: {}", app.config.get_log_dir().display());

    // 备份状态
    info!("💾 备份状态:");
    match app.backup_manager.backup_stats().await {
        Ok(stats) => {
            info!("   数据库备份: {} 个", stats.database_count);
            info!("   文件备份: {} 个", stats.files_count);
            info!("   总大小: {}", format_size(stats.total_size_bytes));
            if let Some(newest) = stats.newest {
                info!("   最新备份: {}", newest.format("%Y-%m-%d %H:%M:%S"));
            } else {
                info!("   ❌ 尚无任何备份，建议运行 'hub-cli backup full'");
            }
        }
        Err(e) => info!("   ❌ 无法读取备份目录: {e}"),
    }

    // 日志状态
    info!("📋 日志状态（最近 24 小时错误数）:");
    for category in logs::KNOWN_CATEGORIES {
        let stats = app.log_writer.get_log_stats(category, 24);
        if stats.total == 0 {
            continue;
        }
        if stats.recent_errors > 0 {
            info!(
                "   ⚠️  {}: {} 条日志, {} 条错误",
                category, stats.total, stats.recent_errors
            );
        } else {
            info!("   ✅ {}: {} 条日志", category, stats.total);
        }
    }

    Ok(())
}
