/// 备份相关常量
pub mod backup {
    use std::path::{Path, PathBuf};

    /// 备份目录名
    pub const BACKUP_DIR_NAME: &str = "backups";

    /// 数据库备份文件前缀
    pub const DB_BACKUP_PREFIX: &str = "db_backup_";

    /// 文件备份前缀
    pub const FILES_BACKUP_PREFIX: &str = "files_backup_";

    /// 数据库导出文件扩展名
    pub const SQL_EXTENSION: &str = ".sql";

    /// gzip 压缩扩展名
    pub const GZ_EXTENSION: &str = ".gz";

    /// 文件归档扩展名
    pub const TAR_GZ_EXTENSION: &str = ".tar.gz";

    /// 备份文件名中嵌入的时间戳格式，例如 20250101_020000
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// 默认备份保留天数
    pub const DEFAULT_RETENTION_DAYS: u32 = 30;

    /// 获取默认备份存储目录（跨平台）
    pub fn get_default_storage_dir() -> PathBuf {
        Path::new(".").join(BACKUP_DIR_NAME)
    }

    /// 默认纳入文件备份的门户目录
    pub fn get_default_include_paths() -> Vec<String> {
        vec![
            "uploads".to_string(),
            "config".to_string(),
            "api".to_string(),
            "admin".to_string(),
            "assets".to_string(),
        ]
    }

    /// 默认排除的路径片段（日志、备份目录自身、版本控制和依赖目录）
    pub fn get_default_exclude_patterns() -> Vec<String> {
        vec![
            "logs".to_string(),
            BACKUP_DIR_NAME.to_string(),
            ".git".to_string(),
            "node_modules".to_string(),
            "vendor".to_string(),
        ]
    }
}

/// 日志相关常量
pub mod logs {
    use std::path::{Path, PathBuf};

    /// 日志目录名
    pub const LOG_DIR_NAME: &str = "logs";

    /// 单个日志文件大小上限（10 MiB）
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

    /// 保留的轮转代数
    pub const DEFAULT_MAX_FILES: u32 = 5;

    /// 日志行时间戳格式
    pub const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// 默认日志分类
    pub const DEFAULT_CATEGORY: &str = "application";

    /// 用户操作日志分类
    pub const CATEGORY_ACTIVITY: &str = "activity";

    /// 安全事件日志分类
    pub const CATEGORY_SECURITY: &str = "security";

    /// API 访问日志分类
    pub const CATEGORY_API: &str = "api";

    /// 数据库操作日志分类
    pub const CATEGORY_DATABASE: &str = "database";

    /// 性能指标日志分类
    pub const CATEGORY_PERFORMANCE: &str = "performance";

    /// 已知日志分类列表（用于状态展示）
    pub const KNOWN_CATEGORIES: &[&str] = &[
        DEFAULT_CATEGORY,
        CATEGORY_ACTIVITY,
        CATEGORY_SECURITY,
        CATEGORY_API,
        CATEGORY_DATABASE,
        CATEGORY_PERFORMANCE,
    ];

    /// 获取默认日志目录（跨平台）
    pub fn get_default_log_dir() -> PathBuf {
        Path::new(".").join(LOG_DIR_NAME)
    }
}

/// 目录访问控制常量
///
/// 备份目录和日志目录位于门户的 Web 根之下，目录中固定放置一个
/// 拒绝访问标记文件，阻止 Web 服务器直接对外提供其中的内容。
pub mod access {
    use std::fs;
    use std::path::Path;

    /// 拒绝访问标记文件名
    pub const DENY_MARKER_FILE: &str = ".htaccess";

    /// 标记文件内容
    pub const DENY_MARKER_CONTENT: &str = "Deny from all\n";

    /// 创建目录并写入拒绝访问标记文件
    pub fn ensure_protected_dir(dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        let marker = dir.join(DENY_MARKER_FILE);
        if !marker.exists() {
            fs::write(&marker, DENY_MARKER_CONTENT)?;
        }
        Ok(())
    }
}

/// 数据库连接相关常量
pub mod database {
    /// 默认数据库主机
    pub const DEFAULT_HOST: &str = "localhost";

    /// 默认数据库端口
    pub const DEFAULT_PORT: u16 = 3306;

    /// 默认数据库名
    pub const DEFAULT_NAME: &str = "campus_hub";

    /// 默认数据库用户
    pub const DEFAULT_USER: &str = "campus_hub";

    /// 数据库导出命令
    pub const MYSQLDUMP_BIN: &str = "mysqldump";

    /// 数据库恢复命令
    pub const MYSQL_BIN: &str = "mysql";
}

/// 配置文件相关常量
pub mod config {
    use std::path::PathBuf;

    /// 配置文件查找顺序
    pub const CONFIG_FILE_CANDIDATES: &[&str] =
        &["config.toml", "campus-hub.toml", ".campus-hub.toml"];

    /// 获取默认配置文件路径
    pub fn get_config_file_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_CANDIDATES[0])
    }
}

/// 版本信息
pub mod version {
    /// 核心库版本（自动从 Cargo.toml 同步）
    pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
}
