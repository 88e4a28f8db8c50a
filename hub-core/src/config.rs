use crate::constants::{backup, database, logs};
use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub backup: BackupConfig,
    pub logs: LogConfig,
}

/// 数据库连接配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

/// 备份相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackupConfig {
    pub storage_dir: String,
    pub retention_days: u32,
    pub include_paths: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

/// 日志相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    pub dir: String,
    pub max_file_size: u64,
    pub max_files: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                host: database::DEFAULT_HOST.to_string(),
                port: database::DEFAULT_PORT,
                name: database::DEFAULT_NAME.to_string(),
                user: database::DEFAULT_USER.to_string(),
                password: String::new(),
            },
            backup: BackupConfig {
                storage_dir: backup::get_default_storage_dir()
                    .to_string_lossy()
                    .to_string(),
                retention_days: backup::DEFAULT_RETENTION_DAYS,
                include_paths: backup::get_default_include_paths(),
                exclude_patterns: backup::get_default_exclude_patterns(),
            },
            logs: LogConfig {
                dir: logs::get_default_log_dir().to_string_lossy().to_string(),
                max_file_size: logs::DEFAULT_MAX_FILE_SIZE,
                max_files: logs::DEFAULT_MAX_FILES,
            },
        }
    }
}

impl AppConfig {
    /// 智能查找并加载配置文件
    /// 按优先级查找：config.toml -> campus-hub.toml -> .campus-hub.toml
    pub fn find_and_load_config() -> Result<Self> {
        for config_file in crate::constants::config::CONFIG_FILE_CANDIDATES {
            if Path::new(config_file).exists() {
                tracing::info!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        Err(HubError::ConfigNotFound)
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_with_comments();
        fs::write(&path, content)?;
        Ok(())
    }

    /// 生成带注释的TOML配置
    fn to_toml_with_comments(&self) -> String {
        const TEMPLATE: &str = include_str!("../templates/config.toml.template");

        TEMPLATE
            .replace("{db_host}", &self.database.host)
            .replace("{db_port}", &self.database.port.to_string())
            .replace("{db_name}", &self.database.name)
            .replace("{db_user}", &self.database.user)
            .replace("{db_password}", &self.database.password)
            .replace("{backup_storage_dir}", &self.backup.storage_dir)
            .replace(
                "{retention_days}",
                &self.backup.retention_days.to_string(),
            )
            .replace(
                "{include_paths}",
                &toml_string_array(&self.backup.include_paths),
            )
            .replace(
                "{exclude_patterns}",
                &toml_string_array(&self.backup.exclude_patterns),
            )
            .replace("{log_dir}", &self.logs.dir)
            .replace("{max_file_size}", &self.logs.max_file_size.to_string())
            .replace("{max_files}", &self.logs.max_files.to_string())
    }

    /// 获取备份目录路径
    pub fn get_backup_dir(&self) -> PathBuf {
        PathBuf::from(&self.backup.storage_dir)
    }

    /// 获取日志目录路径
    pub fn get_log_dir(&self) -> PathBuf {
        PathBuf::from(&self.logs.dir)
    }
}

/// 渲染TOML字符串数组字面量
fn toml_string_array(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|s| format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = AppConfig::default();
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.database.host, config.database.host);
        assert_eq!(loaded.database.port, config.database.port);
        assert_eq!(loaded.backup.retention_days, config.backup.retention_days);
        assert_eq!(loaded.backup.include_paths, config.backup.include_paths);
        assert_eq!(loaded.logs.max_file_size, config.logs.max_file_size);
        assert_eq!(loaded.logs.max_files, config.logs.max_files);
    }

    #[test]
    fn test_missing_config_file() {
        let result = AppConfig::load_from_file("/nonexistent/config.toml");
        assert!(result.is_err());
    }
}
