use crate::app::CliApp;
use crate::cli::BackupCommand;
use crate::utils::format_size;
use hub_core::backup::{BackupOperationResult, BackupRecord};
use hub_core::error::Result;
use tracing::{error, info, warn};

/// 分发备份子命令
pub async fn run_backup_command(app: &CliApp, cmd: BackupCommand) -> Result<()> {
    match cmd {
        BackupCommand::Database => run_backup_database(app).await,
        BackupCommand::Files => run_backup_files(app).await,
        BackupCommand::Full => run_full_backup(app).await,
        BackupCommand::List => run_list_backups(app).await,
        BackupCommand::Stats => run_backup_stats(app).await,
        BackupCommand::Clean { days } => run_clean(app, days).await,
        BackupCommand::Restore { filename, force } => run_restore(app, &filename, force).await,
    }
}

/// 备份数据库
async fn run_backup_database(app: &CliApp) -> Result<()> {
    info!("💾 数据库备份");
    info!("=============");
    info!("   数据库: {}@{}:{}", app.config.database.name, app.config.database.host, app.config.database.port);
    info!("   备份目录: {}", app.config.get_backup_dir().display());

    let result = app.backup_manager.backup_database().await;
    report_result("数据库备份", &result);
    Ok(())
}

/// 备份应用文件
async fn run_backup_files(app: &CliApp) -> Result<()> {
    info!("📦 文件备份");
    info!("===========");
    info!("   备份内容: {}", app.config.backup.include_paths.join(", "));
    info!("   备份目录: {}", app.config.get_backup_dir().display());

    let result = app.backup_manager.backup_files().await;
    report_result("文件备份", &result);
    Ok(())
}

/// 执行完整备份
async fn run_full_backup(app: &CliApp) -> Result<()> {
    info!("🚀 完整备份（数据库 + 文件）");
    info!("============================");

    let result = app.backup_manager.perform_full_backup().await;

    report_result("数据库备份", &result.database);
    report_result("文件备份", &result.files);

    if result.success {
        info!("🎉 完整备份完成");
        if result.pruned > 0 {
            info!("   清理过期备份: {} 个", result.pruned);
        }
    } else {
        error!("❌ 完整备份未全部成功，请检查上面的错误信息");
        info!("💡 两个子备份相互独立，已成功的部分产物会保留");
    }

    Ok(())
}

/// 列出备份
async fn run_list_backups(app: &CliApp) -> Result<()> {
    let listing = match app.backup_manager.list_backups().await {
        Ok(listing) => listing,
        Err(e) => {
            error!("❌ 读取备份目录失败: {e}");
            return Ok(());
        }
    };

    if listing.is_empty() {
        info!("📦 暂无备份");
        info!("💡 使用以下命令创建备份:");
        info!("   hub-cli backup full");
        return Ok(());
    }

    info!("📦 备份列表");
    info!("============");
    info!(
        "{:<10} {:<20} {:<10} {:<8} {}",
        "类型", "创建时间", "大小", "天数", "文件名"
    );
    info!("{}", "-".repeat(90));

    for record in listing.iter_all() {
        print_record(record);
    }

    info!("{}", "-".repeat(90));
    info!("📊 数据库备份 {} 个，文件备份 {} 个", listing.database.len(), listing.files.len());
    info!("💡 可用操作:");
    info!("   - 恢复数据库: hub-cli backup restore <文件名>");
    info!("   - 清理过期备份: hub-cli backup clean");

    Ok(())
}

fn print_record(record: &BackupRecord) {
    let kind_display = match record.kind {
        hub_core::backup::BackupKind::Database => "数据库",
        hub_core::backup::BackupKind::Files => "文件",
    };

    info!(
        "{:<10} {:<20} {:<10} {:<8} {}",
        kind_display,
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        format_size(record.size_bytes),
        record.age_days(),
        record.filename
    );
}

/// 显示备份统计
async fn run_backup_stats(app: &CliApp) -> Result<()> {
    let stats = match app.backup_manager.backup_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            error!("❌ 读取备份目录失败: {e}");
            return Ok(());
        }
    };

    info!("📊 备份统计");
    info!("============");
    info!("   数据库备份: {} 个", stats.database_count);
    info!("   文件备份: {} 个", stats.files_count);
    info!("   总数: {} 个", stats.total_count);
    info!("   总大小: {}", format_size(stats.total_size_bytes));
    if let Some(oldest) = stats.oldest {
        info!("   最早备份: {}", oldest.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(newest) = stats.newest {
        info!("   最新备份: {}", newest.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

/// 清理过期备份
async fn run_clean(app: &CliApp, days: Option<u32>) -> Result<()> {
    let retention_days = days.unwrap_or(app.config.backup.retention_days);
    info!("🧹 清理超过 {retention_days} 天的备份...");

    match app.backup_manager.clean_old_backups(retention_days).await {
        Ok(0) => info!("✅ 没有超过保留期的备份"),
        Ok(count) => info!("✅ 已删除 {count} 个过期备份"),
        Err(e) => error!("❌ 清理失败: {e}"),
    }

    Ok(())
}

/// 从备份恢复数据库
async fn run_restore(app: &CliApp, filename: &str, force: bool) -> Result<()> {
    if !force {
        warn!(
            "⚠️  警告: 此操作将覆盖数据库 {} 的当前数据!",
            app.config.database.name
        );
        print!("请确认要从备份 {filename} 恢复 (y/N): ");

        use std::io::Write;
        std::io::stdout().flush().unwrap();

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "y" {
            warn!("操作已取消");
            return Ok(());
        }
    }

    info!("开始恢复操作...");
    let result = app.backup_manager.restore_database(filename).await;

    if result.success {
        info!("✅ 数据库恢复完成");
        info!("   耗时: {:.2} 秒", result.execution_time_secs);
    } else {
        let message = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "未知错误".to_string());
        error!("❌ 数据库恢复失败: {message}");
        info!("💡 使用 'hub-cli backup list' 查看可用的备份文件");
    }

    Ok(())
}

/// 打印单次备份操作的结果
fn report_result(operation: &str, result: &BackupOperationResult) {
    if result.success {
        if let Some(record) = &result.record {
            info!("🎉 {operation}成功！");
            info!("   备份文件: {}", record.filename);
            info!("   文件大小: {}", format_size(record.size_bytes));
            info!(
                "   创建时间: {}",
                record.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            info!("   耗时: {:.2} 秒", result.execution_time_secs);
        }
    } else {
        let message = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "未知错误".to_string());
        error!("❌ {operation}失败: {message}");
    }
}
