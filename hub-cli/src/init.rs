use hub_core::{config::AppConfig, constants::access, constants::config, error::Result};
use tracing::{info, warn};

/// 运行独立的初始化流程
pub async fn run_init(force: bool) -> Result<()> {
    info!("🏫 Campus Hub 维护工具初始化");
    info!("============================");

    // 检查是否已经初始化过
    if !force && config::get_config_file_path().exists() {
        warn!("⚠️  检测到已存在的配置文件");
        info!("如果您要重新初始化，请使用 --force 参数");
        info!("示例: hub-cli init --force");
        return Ok(());
    }

    info!("📋 步骤 1: 创建配置文件");

    // 创建默认配置
    let app_config = AppConfig::default();
    app_config.save_to_file(config::get_config_file_path())?;
    info!("   ✅ 创建配置文件: {}", config::get_config_file_path().display());

    info!("📋 步骤 2: 创建目录结构");

    // 备份目录和日志目录带访问拒绝标记文件，避免被 Web 服务器直接对外提供
    access::ensure_protected_dir(&app_config.get_backup_dir())?;
    access::ensure_protected_dir(&app_config.get_log_dir())?;
    info!("   ✅ 创建目录结构:");
    info!("      - {}    (备份存储目录)", app_config.backup.storage_dir);
    info!("      - {}       (日志目录)", app_config.logs.dir);

    info!("🎉 初始化完成！");
    info!("");
    info!("📝 接下来的步骤:");
    info!("   1️⃣  编辑 config.toml，填写数据库连接参数");
    info!("   2️⃣  运行 'hub-cli backup full' 创建首个完整备份");
    info!("   3️⃣  运行 'hub-cli status' 查看当前状态");
    info!("");
    info!("💡 提示:");
    info!("   - 配置文件: config.toml (可手动编辑修改配置)");
    info!("   - 使用 'hub-cli --help' 查看所有可用命令");

    Ok(())
}
