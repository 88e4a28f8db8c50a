use hub_core::{
    backup::BackupManager, command::SystemCommandRunner, config::AppConfig, error::Result,
    logger::LogWriter,
};
use std::path::Path;
use std::sync::Arc;

use crate::cli::Commands;
use crate::commands;

/// CLI 应用上下文
///
/// 日志写入器由入口显式构造，以句柄注入到需要它的组件中。
#[derive(Clone)]
pub struct CliApp {
    pub config: AppConfig,
    pub log_writer: Arc<LogWriter>,
    pub backup_manager: BackupManager<SystemCommandRunner>,
}

impl CliApp {
    /// 使用智能配置查找初始化CLI应用
    pub async fn new_with_auto_config(config_path: &Path) -> Result<Self> {
        // 显式指定的配置文件优先，否则按候选列表查找
        let config = if config_path.exists() {
            AppConfig::load_from_file(config_path)?
        } else {
            AppConfig::find_and_load_config()?
        };

        Self::with_config(config)
    }

    /// 从已加载的配置构建应用
    pub fn with_config(config: AppConfig) -> Result<Self> {
        let log_writer = Arc::new(LogWriter::new(&config.logs));
        let backup_manager =
            BackupManager::new(&config, SystemCommandRunner, Arc::clone(&log_writer))?;

        Ok(Self {
            config,
            log_writer,
            backup_manager,
        })
    }

    /// 运行应用命令
    pub async fn run_command(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Status => commands::run_status(self).await,
            Commands::Init { .. } => unreachable!(), // 已经在 main.rs 中处理
            Commands::Backup(backup_cmd) => commands::run_backup_command(self, backup_cmd).await,
            Commands::Logs(logs_cmd) => commands::run_logs_command(self, logs_cmd).await,
        }
    }
}
