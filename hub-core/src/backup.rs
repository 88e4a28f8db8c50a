use crate::command::CommandRunner;
use crate::config::{AppConfig, DatabaseConfig};
use crate::constants::{access, backup as consts, database as db, logs};
use crate::error::{BackupError, Result};
use crate::logger::{LogContext, LogLevel, LogWriter};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tar::Builder;
use walkdir::WalkDir;

/// 备份类型，由文件名前缀约定区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupKind {
    Database,
    Files,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::Database => "database",
            BackupKind::Files => "files",
        }
    }
}

/// 备份目录中的一个备份产物
///
/// 文件名中嵌入创建时间戳，备份目录本身就是索引，不另设记录存储。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub filename: String,
    pub kind: BackupKind,
    pub size_bytes: u64,
    pub created_at: DateTime<Local>,
}

impl BackupRecord {
    /// 备份距今的天数
    pub fn age_days(&self) -> i64 {
        (Local::now() - self.created_at).num_days()
    }
}

/// 单次备份或恢复操作的结果
///
/// `record` 与 `error` 恰好有一个被填充。
#[derive(Debug, Clone)]
pub struct BackupOperationResult {
    pub success: bool,
    pub record: Option<BackupRecord>,
    pub error: Option<BackupError>,
    pub execution_time_secs: f64,
    pub timestamp: DateTime<Local>,
}

impl BackupOperationResult {
    fn ok(record: BackupRecord, elapsed: std::time::Duration) -> Self {
        Self {
            success: true,
            record: Some(record),
            error: None,
            execution_time_secs: elapsed.as_secs_f64(),
            timestamp: Local::now(),
        }
    }

    fn fail(error: BackupError, elapsed: std::time::Duration) -> Self {
        Self {
            success: false,
            record: None,
            error: Some(error),
            execution_time_secs: elapsed.as_secs_f64(),
            timestamp: Local::now(),
        }
    }
}

/// 完整备份（数据库 + 文件）的组合结果
#[derive(Debug, Clone)]
pub struct FullBackupResult {
    pub database: BackupOperationResult,
    pub files: BackupOperationResult,
    pub success: bool,
    /// 成功后保留期清理删除的文件数
    pub pruned: usize,
}

/// 按类型分组的备份列表，每组按创建时间倒序
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupListing {
    pub database: Vec<BackupRecord>,
    pub files: Vec<BackupRecord>,
}

impl BackupListing {
    pub fn is_empty(&self) -> bool {
        self.database.is_empty() && self.files.is_empty()
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &BackupRecord> {
        self.database.iter().chain(self.files.iter())
    }
}

/// 备份目录的聚合统计
#[derive(Debug, Clone, Serialize)]
pub struct BackupStats {
    pub database_count: usize,
    pub files_count: usize,
    pub total_count: usize,
    pub total_size_bytes: u64,
    pub oldest: Option<DateTime<Local>>,
    pub newest: Option<DateTime<Local>>,
}

/// 备份管理器
///
/// 负责生成、枚举、清理和恢复备份产物，调用方不接触具体的导出/恢复命令。
/// 公开操作从不向外抛错，失败以结果值返回并在返回前清理残留产物。
#[derive(Debug, Clone)]
pub struct BackupManager<R: CommandRunner> {
    storage_dir: PathBuf,
    database: DatabaseConfig,
    include_paths: Vec<PathBuf>,
    exclude_patterns: Vec<String>,
    retention_days: u32,
    runner: R,
    logger: Arc<LogWriter>,
}

impl<R: CommandRunner> BackupManager<R> {
    /// 创建备份管理器，并确保备份目录和访问标记文件存在
    pub fn new(config: &AppConfig, runner: R, logger: Arc<LogWriter>) -> Result<Self> {
        let storage_dir = config.get_backup_dir();
        access::ensure_protected_dir(&storage_dir)?;

        Ok(Self {
            storage_dir,
            database: config.database.clone(),
            include_paths: config.backup.include_paths.iter().map(PathBuf::from).collect(),
            exclude_patterns: config.backup.exclude_patterns.clone(),
            retention_days: config.backup.retention_days,
            runner,
            logger,
        })
    }

    /// 获取备份存储目录
    pub fn get_storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// 备份数据库
    ///
    /// 导出写入 db_backup_<时间戳>.sql，成功后压缩为 .sql.gz 并删除未压缩
    /// 的中间文件；任何失败路径上两者都会被清理。
    pub async fn backup_database(&self) -> BackupOperationResult {
        let started = Instant::now();
        let timestamp = Local::now().format(consts::TIMESTAMP_FORMAT).to_string();
        let sql_path = self.storage_dir.join(format!(
            "{}{}{}",
            consts::DB_BACKUP_PREFIX,
            timestamp,
            consts::SQL_EXTENSION
        ));
        let gz_path = PathBuf::from(format!("{}{}", sql_path.display(), consts::GZ_EXTENSION));

        tracing::info!("开始数据库备份: {}", gz_path.display());

        match self.try_dump_database(&sql_path, &gz_path).await {
            Ok(record) => {
                let elapsed = started.elapsed();
                tracing::info!(
                    "数据库备份成功: {} ({} 字节)",
                    record.filename,
                    record.size_bytes
                );
                self.logger.log_database(
                    "backup",
                    &format!("数据库备份完成: {}", record.filename),
                    elapsed.as_millis() as u64,
                    true,
                );
                BackupOperationResult::ok(record, elapsed)
            }
            Err(e) => {
                self.remove_artifacts(&[&sql_path, &gz_path]).await;
                let elapsed = started.elapsed();
                tracing::error!("数据库备份失败: {e}");
                self.logger.log_database(
                    "backup",
                    &format!("数据库备份失败: {e}"),
                    elapsed.as_millis() as u64,
                    false,
                );
                BackupOperationResult::fail(e, elapsed)
            }
        }
    }

    /// 备份应用文件
    ///
    /// 将配置的目录归档为 files_backup_<时间戳>.tar.gz，按排除列表过滤；
    /// 失败/清理契约与数据库备份一致。
    pub async fn backup_files(&self) -> BackupOperationResult {
        let started = Instant::now();
        let timestamp = Local::now().format(consts::TIMESTAMP_FORMAT).to_string();
        let archive_path = self.storage_dir.join(format!(
            "{}{}{}",
            consts::FILES_BACKUP_PREFIX,
            timestamp,
            consts::TAR_GZ_EXTENSION
        ));

        tracing::info!("开始文件备份: {}", archive_path.display());

        match self.try_archive_files(&archive_path).await {
            Ok(record) => {
                let elapsed = started.elapsed();
                tracing::info!(
                    "文件备份成功: {} ({} 字节)",
                    record.filename,
                    record.size_bytes
                );
                let mut context = LogContext::new();
                context.insert("filename".to_string(), json!(record.filename));
                context.insert("size_bytes".to_string(), json!(record.size_bytes));
                self.logger.log(
                    LogLevel::Info,
                    &format!("文件备份完成: {}", record.filename),
                    context,
                    logs::DEFAULT_CATEGORY,
                );
                BackupOperationResult::ok(record, elapsed)
            }
            Err(e) => {
                self.remove_artifacts(&[&archive_path]).await;
                let elapsed = started.elapsed();
                tracing::error!("文件备份失败: {e}");
                self.logger.log(
                    LogLevel::Error,
                    &format!("文件备份失败: {e}"),
                    LogContext::new(),
                    logs::DEFAULT_CATEGORY,
                );
                BackupOperationResult::fail(e, elapsed)
            }
        }
    }

    /// 执行完整备份（数据库 + 文件），两者都成功才算成功
    ///
    /// 成功后按配置的保留期清理过期备份。两个子备份之间没有原子性，
    /// 部分失败时由调用方通过组合结果判断。
    pub async fn perform_full_backup(&self) -> FullBackupResult {
        let database = self.backup_database().await;
        let files = self.backup_files().await;
        let success = database.success && files.success;

        let pruned = if success {
            match self.clean_old_backups(self.retention_days).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!("清理过期备份失败: {e}");
                    0
                }
            }
        } else {
            0
        };

        FullBackupResult {
            database,
            files,
            success,
            pruned,
        }
    }

    /// 扫描备份目录，按文件名前缀分类列出所有备份
    pub async fn list_backups(&self) -> Result<BackupListing> {
        let mut listing = BackupListing::default();

        let mut entries = tokio::fs::read_dir(&self.storage_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name().to_string_lossy().to_string();
            let kind = match classify(&filename) {
                Some(kind) => kind,
                None => continue,
            };

            let meta = entry.metadata().await?;
            let created_at = match parse_timestamp_from_name(&filename, kind) {
                Some(ts) => ts,
                None => meta
                    .modified()
                    .map(DateTime::<Local>::from)
                    .unwrap_or_else(|_| Local::now()),
            };

            let record = BackupRecord {
                filename,
                kind,
                size_bytes: meta.len(),
                created_at,
            };
            match kind {
                BackupKind::Database => listing.database.push(record),
                BackupKind::Files => listing.files.push(record),
            }
        }

        listing.database.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listing.files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listing)
    }

    /// 从指定备份恢复数据库
    ///
    /// 压缩产物先解压到临时文件再执行恢复命令，临时文件在所有退出路径上
    /// 都会被删除。
    pub async fn restore_database(&self, filename: &str) -> BackupOperationResult {
        let started = Instant::now();
        tracing::info!("开始从备份恢复数据库: {filename}");

        match self.try_restore_database(filename).await {
            Ok(record) => {
                let elapsed = started.elapsed();
                tracing::info!("数据库恢复成功: {}", record.filename);
                self.logger.log_database(
                    "restore",
                    &format!("数据库恢复完成: {}", record.filename),
                    elapsed.as_millis() as u64,
                    true,
                );
                BackupOperationResult::ok(record, elapsed)
            }
            Err(e) => {
                let elapsed = started.elapsed();
                tracing::error!("数据库恢复失败: {e}");
                self.logger.log_database(
                    "restore",
                    &format!("数据库恢复失败: {e}"),
                    elapsed.as_millis() as u64,
                    false,
                );
                BackupOperationResult::fail(e, elapsed)
            }
        }
    }

    /// 删除修改时间超过保留期的备份产物，返回删除数量
    ///
    /// 无确认步骤；非备份产物（如访问标记文件）不在清理范围内。
    pub async fn clean_old_backups(&self, retention_days: u32) -> Result<usize> {
        let cutoff =
            SystemTime::now() - std::time::Duration::from_secs(retention_days as u64 * 86400);

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.storage_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name().to_string_lossy().to_string();
            if classify(&filename).is_none() {
                continue;
            }

            let meta = entry.metadata().await?;
            let modified = match meta.modified() {
                Ok(modified) => modified,
                Err(_) => continue,
            };

            if modified < cutoff {
                tokio::fs::remove_file(entry.path()).await?;
                tracing::info!("删除过期备份: {filename}");
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// 备份目录的聚合统计，由 list_backups 派生
    pub async fn backup_stats(&self) -> Result<BackupStats> {
        let listing = self.list_backups().await?;

        let mut stats = BackupStats {
            database_count: listing.database.len(),
            files_count: listing.files.len(),
            total_count: listing.database.len() + listing.files.len(),
            total_size_bytes: 0,
            oldest: None,
            newest: None,
        };

        for record in listing.iter_all() {
            stats.total_size_bytes += record.size_bytes;
            stats.oldest = Some(
                stats
                    .oldest
                    .map_or(record.created_at, |o| o.min(record.created_at)),
            );
            stats.newest = Some(
                stats
                    .newest
                    .map_or(record.created_at, |n| n.max(record.created_at)),
            );
        }

        Ok(stats)
    }

    async fn try_dump_database(
        &self,
        sql_path: &Path,
        gz_path: &Path,
    ) -> std::result::Result<BackupRecord, BackupError> {
        let args: Vec<String> = vec![
            format!("--host={}", self.database.host),
            format!("--port={}", self.database.port),
            format!("--user={}", self.database.user),
            format!("--password={}", self.database.password),
            "--single-transaction".to_string(),
            "--routines".to_string(),
            "--triggers".to_string(),
            self.database.name.clone(),
        ];

        let output = self
            .runner
            .run(db::MYSQLDUMP_BIN, &args)
            .await
            .map_err(|e| BackupError::Subprocess(e.to_string()))?;
        if !output.success() {
            return Err(BackupError::Subprocess(output.combined_output()));
        }

        tokio::fs::write(sql_path, &output.stdout).await?;

        let size = tokio::fs::metadata(sql_path).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(BackupError::EmptyArtifact(sql_path.display().to_string()));
        }

        // 压缩在后台线程执行，避免阻塞异步运行时
        {
            let src = sql_path.to_path_buf();
            let dst = gz_path.to_path_buf();
            tokio::task::spawn_blocking(move || gzip_file(&src, &dst))
                .await
                .map_err(|e| BackupError::Io(e.to_string()))??;
        }
        tokio::fs::remove_file(sql_path).await?;

        self.record_for(gz_path).await
    }

    async fn try_archive_files(
        &self,
        archive_path: &Path,
    ) -> std::result::Result<BackupRecord, BackupError> {
        let sources: Vec<PathBuf> = self
            .include_paths
            .iter()
            .filter(|p| p.exists())
            .cloned()
            .collect();
        if sources.is_empty() {
            return Err(BackupError::EmptyArtifact("没有可归档的源目录".to_string()));
        }

        let exclude = self.exclude_patterns.clone();
        let dst = archive_path.to_path_buf();
        let appended = tokio::task::spawn_blocking(move || build_archive(&dst, &sources, &exclude))
            .await
            .map_err(|e| BackupError::Io(e.to_string()))??;

        if appended == 0 {
            return Err(BackupError::EmptyArtifact("归档中没有任何文件".to_string()));
        }

        self.record_for(archive_path).await
    }

    async fn try_restore_database(
        &self,
        filename: &str,
    ) -> std::result::Result<BackupRecord, BackupError> {
        // 只取文件名部分，备份文件始终位于备份目录内
        let filename = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| BackupError::NotFound(filename.to_string()))?;

        let path = self.storage_dir.join(&filename);
        if !path.exists() {
            return Err(BackupError::NotFound(filename.clone()));
        }

        let record = self.record_for(&path).await?;
        if record.kind != BackupKind::Database {
            return Err(BackupError::NotFound(format!(
                "不是数据库备份: {filename}"
            )));
        }

        // 临时文件在函数的所有退出路径上随作用域结束被删除
        let temp_file = tempfile::Builder::new()
            .prefix("hub_restore_")
            .suffix(consts::SQL_EXTENSION)
            .tempfile()
            .map_err(|e| BackupError::Io(e.to_string()))?;

        let sql_path = if filename.ends_with(consts::GZ_EXTENSION)
            && !filename.ends_with(consts::TAR_GZ_EXTENSION)
        {
            let src = path.clone();
            let dst = temp_file.path().to_path_buf();
            tokio::task::spawn_blocking(move || gunzip_file(&src, &dst))
                .await
                .map_err(|e| BackupError::Io(e.to_string()))??;
            temp_file.path().to_path_buf()
        } else {
            path.clone()
        };

        let args: Vec<String> = vec![
            format!("--host={}", self.database.host),
            format!("--port={}", self.database.port),
            format!("--user={}", self.database.user),
            format!("--password={}", self.database.password),
            self.database.name.clone(),
            "-e".to_string(),
            format!("SOURCE {};", sql_path.display()),
        ];

        let output = self
            .runner
            .run(db::MYSQL_BIN, &args)
            .await
            .map_err(|e| BackupError::Subprocess(e.to_string()))?;
        if !output.success() {
            return Err(BackupError::Subprocess(output.combined_output()));
        }

        Ok(record)
    }

    async fn record_for(&self, path: &Path) -> std::result::Result<BackupRecord, BackupError> {
        let meta = tokio::fs::metadata(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| BackupError::Io("无法获取备份文件名".to_string()))?;
        let kind = classify(&filename)
            .ok_or_else(|| BackupError::Io(format!("无法识别的备份文件名: {filename}")))?;

        let created_at = match parse_timestamp_from_name(&filename, kind) {
            Some(ts) => ts,
            None => meta
                .modified()
                .map(DateTime::<Local>::from)
                .unwrap_or_else(|_| Local::now()),
        };

        Ok(BackupRecord {
            filename,
            kind,
            size_bytes: meta.len(),
            created_at,
        })
    }

    /// 尽力删除失败后可能残留的中间产物
    async fn remove_artifacts(&self, paths: &[&Path]) {
        for path in paths {
            if path.exists() {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    tracing::warn!("清理残留备份产物失败 {}: {e}", path.display());
                }
            }
        }
    }
}

/// 按文件名前缀识别备份类型
fn classify(filename: &str) -> Option<BackupKind> {
    if filename.starts_with(consts::DB_BACKUP_PREFIX) {
        Some(BackupKind::Database)
    } else if filename.starts_with(consts::FILES_BACKUP_PREFIX) {
        Some(BackupKind::Files)
    } else {
        None
    }
}

/// 从文件名中解析嵌入的创建时间戳
fn parse_timestamp_from_name(filename: &str, kind: BackupKind) -> Option<DateTime<Local>> {
    let prefix = match kind {
        BackupKind::Database => consts::DB_BACKUP_PREFIX,
        BackupKind::Files => consts::FILES_BACKUP_PREFIX,
    };
    let rest = filename.strip_prefix(prefix)?;
    let raw = rest.get(..15)?;
    let naive = NaiveDateTime::parse_from_str(raw, consts::TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// 路径是否命中排除列表（按文本片段匹配）
fn is_excluded(path: &Path, patterns: &[String]) -> bool {
    let text = path.to_string_lossy();
    patterns.iter().any(|p| text.contains(p.as_str()))
}

/// 将多个源目录归档为 tar.gz，返回归档的文件数
fn build_archive(
    dst: &Path,
    sources: &[PathBuf],
    exclude_patterns: &[String],
) -> std::result::Result<usize, BackupError> {
    let file = File::create(dst)?;
    let encoder = GzEncoder::new(file, Compression::new(6));
    let mut archive = Builder::new(encoder);
    let mut appended = 0usize;

    for source in sources {
        let dir_name = source
            .file_name()
            .ok_or_else(|| BackupError::Io(format!("无法获取目录名: {}", source.display())))?
            .to_string_lossy()
            .to_string();

        if source.is_file() {
            if !is_excluded(source, exclude_patterns) {
                archive
                    .append_path_with_name(source, &dir_name)
                    .map_err(|e| BackupError::Io(format!("添加文件到归档失败: {e}")))?;
                appended += 1;
            }
            continue;
        }

        for entry in WalkDir::new(source) {
            let entry = entry.map_err(|e| BackupError::Io(format!("遍历目录失败: {e}")))?;
            let path = entry.path();

            if !path.is_file() || is_excluded(path, exclude_patterns) {
                continue;
            }

            let relative = path
                .strip_prefix(source)
                .map_err(|e| BackupError::Io(format!("计算相对路径失败: {e}")))?;

            // tar归档内部使用Unix风格路径（/），跨平台兼容
            let archive_name = if cfg!(windows) {
                format!(
                    "{}/{}",
                    dir_name,
                    relative.display().to_string().replace('\\', "/")
                )
            } else {
                format!("{}/{}", dir_name, relative.display())
            };

            archive
                .append_path_with_name(path, archive_name)
                .map_err(|e| BackupError::Io(format!("添加文件到归档失败: {e}")))?;
            appended += 1;
        }
    }

    let encoder = archive
        .into_inner()
        .map_err(|e| BackupError::Io(format!("完成归档失败: {e}")))?;
    encoder
        .finish()
        .map_err(|e| BackupError::Io(format!("完成归档失败: {e}")))?;

    Ok(appended)
}

/// gzip 压缩单个文件
fn gzip_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    let mut input = File::open(src)?;
    let output = File::create(dst)?;
    let mut encoder = GzEncoder::new(output, Compression::new(6));
    std::io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

/// 解压 gzip 文件
fn gunzip_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    let input = File::open(src)?;
    let mut decoder = GzDecoder::new(input);
    let mut output = File::create(dst)?;
    std::io::copy(&mut decoder, &mut output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::error::HubError;
    use std::fs;
    use tempfile::tempdir;

    /// 返回固定输出的执行器
    struct MockRunner {
        exit_code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    }

    impl MockRunner {
        fn ok(stdout: &[u8]) -> Self {
            Self {
                exit_code: 0,
                stdout: stdout.to_vec(),
                stderr: Vec::new(),
            }
        }

        fn failing(stderr: &[u8]) -> Self {
            Self {
                exit_code: 1,
                stdout: Vec::new(),
                stderr: stderr.to_vec(),
            }
        }
    }

    impl CommandRunner for MockRunner {
        async fn run(&self, _program: &str, _args: &[String]) -> Result<CommandOutput> {
            Ok(CommandOutput {
                exit_code: Some(self.exit_code),
                stdout: self.stdout.clone(),
                stderr: self.stderr.clone(),
            })
        }
    }

    /// 模拟命令不存在的执行器
    struct UnavailableRunner;

    impl CommandRunner for UnavailableRunner {
        async fn run(&self, program: &str, _args: &[String]) -> Result<CommandOutput> {
            Err(HubError::custom(format!("{program} 未安装或不在 PATH 中")))
        }
    }

    fn test_manager<R: CommandRunner>(root: &Path, runner: R) -> BackupManager<R> {
        let mut config = AppConfig::default();
        config.backup.storage_dir = root.join("backups").to_string_lossy().to_string();
        config.backup.include_paths = vec![
            root.join("uploads").to_string_lossy().to_string(),
            root.join("config").to_string_lossy().to_string(),
        ];
        config.backup.exclude_patterns = vec!["node_modules".to_string()];
        config.logs.dir = root.join("logs").to_string_lossy().to_string();

        let logger = Arc::new(LogWriter::new(&config.logs));
        BackupManager::new(&config, runner, logger).unwrap()
    }

    /// 备份目录中的备份产物文件名（标记文件等除外）
    fn backup_artifacts(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| classify(name).is_some())
            .collect()
    }

    fn create_portal_files(root: &Path) {
        fs::create_dir_all(root.join("uploads/sub")).unwrap();
        fs::create_dir_all(root.join("config")).unwrap();
        fs::write(root.join("uploads/a.txt"), "alpha").unwrap();
        fs::write(root.join("uploads/sub/b.txt"), "beta").unwrap();
        fs::write(root.join("config/app.toml"), "debug = false").unwrap();
    }

    #[tokio::test]
    async fn test_backup_database_success() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(
            temp_dir.path(),
            MockRunner::ok(b"-- MySQL dump\nCREATE TABLE users (id INT);\n"),
        );

        let result = manager.backup_database().await;
        assert!(result.success);
        assert!(result.error.is_none());

        let record = result.record.unwrap();
        assert_eq!(record.kind, BackupKind::Database);
        assert!(record.filename.starts_with(consts::DB_BACKUP_PREFIX));
        assert!(record.filename.ends_with(".sql.gz"));
        assert!(record.size_bytes > 0);

        let dir = manager.get_storage_dir();
        assert!(dir.join(&record.filename).exists());

        // 未压缩的中间文件不残留
        let sql_name = record.filename.trim_end_matches(consts::GZ_EXTENSION);
        assert!(!dir.join(sql_name).exists());
    }

    #[tokio::test]
    async fn test_backup_database_dump_failure_leaves_no_artifacts() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(
            temp_dir.path(),
            MockRunner::failing(b"Access denied for user"),
        );

        let result = manager.backup_database().await;
        assert!(!result.success);
        assert!(result.record.is_none());
        match result.error {
            Some(BackupError::Subprocess(msg)) => assert!(msg.contains("Access denied")),
            other => panic!("期望 Subprocess 错误，得到 {other:?}"),
        }

        assert!(backup_artifacts(manager.get_storage_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_backup_database_unavailable_command() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), UnavailableRunner);

        let result = manager.backup_database().await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(BackupError::Subprocess(_))));
        assert!(backup_artifacts(manager.get_storage_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_backup_database_empty_dump() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));

        let result = manager.backup_database().await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(BackupError::EmptyArtifact(_))));
        assert!(backup_artifacts(manager.get_storage_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_backup_files_success() {
        let temp_dir = tempdir().unwrap();
        create_portal_files(temp_dir.path());
        // 排除列表命中的内容不进入归档
        fs::create_dir_all(temp_dir.path().join("uploads/node_modules")).unwrap();
        fs::write(temp_dir.path().join("uploads/node_modules/skip.js"), "x").unwrap();

        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));
        let result = manager.backup_files().await;
        assert!(result.success);

        let record = result.record.unwrap();
        assert_eq!(record.kind, BackupKind::Files);
        assert!(record.filename.starts_with(consts::FILES_BACKUP_PREFIX));
        assert!(record.filename.ends_with(".tar.gz"));

        let file = File::open(manager.get_storage_dir().join(&record.filename)).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();

        assert!(names.contains(&"uploads/a.txt".to_string()));
        assert!(names.contains(&"uploads/sub/b.txt".to_string()));
        assert!(names.contains(&"config/app.toml".to_string()));
        assert!(!names.iter().any(|n| n.contains("node_modules")));
    }

    #[tokio::test]
    async fn test_backup_files_without_sources() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));

        let result = manager.backup_files().await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(BackupError::EmptyArtifact(_))));
        assert!(backup_artifacts(manager.get_storage_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_full_backup_success() {
        let temp_dir = tempdir().unwrap();
        create_portal_files(temp_dir.path());
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b"CREATE TABLE t (id INT);"));

        let result = manager.perform_full_backup().await;
        assert!(result.success);
        assert!(result.database.success);
        assert!(result.files.success);
        // 刚产生的备份不会被保留期清理删除
        assert_eq!(result.pruned, 0);
        assert_eq!(backup_artifacts(manager.get_storage_dir()).len(), 2);
    }

    #[tokio::test]
    async fn test_full_backup_partial_failure() {
        let temp_dir = tempdir().unwrap();
        create_portal_files(temp_dir.path());
        let manager = test_manager(temp_dir.path(), MockRunner::failing(b"connection refused"));

        let result = manager.perform_full_backup().await;
        assert!(!result.success);
        assert!(!result.database.success);
        assert!(result.files.success);

        // 数据库备份失败不残留产物，文件备份产物保留
        let artifacts = backup_artifacts(manager.get_storage_dir());
        assert_eq!(artifacts.len(), 1);
        assert!(artifacts[0].starts_with(consts::FILES_BACKUP_PREFIX));
    }

    #[tokio::test]
    async fn test_list_backups_sorted_newest_first() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));
        let dir = manager.get_storage_dir();

        fs::write(dir.join("db_backup_20250101_000000.sql.gz"), "a").unwrap();
        fs::write(dir.join("db_backup_20250103_000000.sql.gz"), "bb").unwrap();
        fs::write(dir.join("files_backup_20250102_000000.tar.gz"), "ccc").unwrap();
        fs::write(dir.join("unrelated.txt"), "x").unwrap();

        let listing = manager.list_backups().await.unwrap();
        assert_eq!(listing.database.len(), 2);
        assert_eq!(listing.files.len(), 1);
        assert!(listing.database[0].filename.contains("20250103"));
        assert!(listing.database[1].filename.contains("20250101"));
    }

    #[tokio::test]
    async fn test_backup_stats() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));
        let dir = manager.get_storage_dir();

        fs::write(dir.join("db_backup_20250101_000000.sql.gz"), "a").unwrap();
        fs::write(dir.join("db_backup_20250103_000000.sql.gz"), "bb").unwrap();
        fs::write(dir.join("files_backup_20250102_000000.tar.gz"), "ccc").unwrap();

        let stats = manager.backup_stats().await.unwrap();
        assert_eq!(stats.database_count, 2);
        assert_eq!(stats.files_count, 1);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.total_size_bytes, 6);
        assert_eq!(
            stats.oldest.unwrap().format("%Y%m%d").to_string(),
            "20250101"
        );
        assert_eq!(
            stats.newest.unwrap().format("%Y%m%d").to_string(),
            "20250103"
        );
    }

    #[tokio::test]
    async fn test_clean_old_backups_idempotent() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));
        let dir = manager.get_storage_dir().to_path_buf();

        fs::write(dir.join("db_backup_20250101_000000.sql.gz"), "a").unwrap();
        fs::write(dir.join("files_backup_20250102_000000.tar.gz"), "b").unwrap();

        // 保留期内不删除
        assert_eq!(manager.clean_old_backups(30).await.unwrap(), 0);
        assert_eq!(backup_artifacts(&dir).len(), 2);

        // 保留期为 0 时，稍等片刻后全部超期
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(manager.clean_old_backups(0).await.unwrap(), 2);
        assert_eq!(manager.clean_old_backups(0).await.unwrap(), 0);
        assert!(backup_artifacts(&dir).is_empty());

        // 标记文件不受影响
        assert!(dir.join(access::DENY_MARKER_FILE).exists());
    }

    #[tokio::test]
    async fn test_restore_database_not_found() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));

        let result = manager.restore_database("db_backup_20990101_000000.sql.gz").await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(BackupError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_restore_database_success() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));
        let dir = manager.get_storage_dir();

        // 构造一个压缩的数据库备份
        let sql_path = temp_dir.path().join("dump.sql");
        fs::write(&sql_path, "CREATE TABLE t (id INT);").unwrap();
        let gz_path = dir.join("db_backup_20250101_120000.sql.gz");
        gzip_file(&sql_path, &gz_path).unwrap();

        let result = manager.restore_database("db_backup_20250101_120000.sql.gz").await;
        assert!(result.success, "恢复失败: {:?}", result.error);

        let record = result.record.unwrap();
        assert_eq!(record.kind, BackupKind::Database);
        assert_eq!(record.filename, "db_backup_20250101_120000.sql.gz");
    }

    #[tokio::test]
    async fn test_restore_database_failure() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::failing(b"ERROR 1045"));
        let dir = manager.get_storage_dir();

        let sql_path = temp_dir.path().join("dump.sql");
        fs::write(&sql_path, "CREATE TABLE t (id INT);").unwrap();
        let gz_path = dir.join("db_backup_20250101_120000.sql.gz");
        gzip_file(&sql_path, &gz_path).unwrap();

        let result = manager.restore_database("db_backup_20250101_120000.sql.gz").await;
        assert!(!result.success);
        match result.error {
            Some(BackupError::Subprocess(msg)) => assert!(msg.contains("ERROR 1045")),
            other => panic!("期望 Subprocess 错误，得到 {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_restore_rejects_files_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = test_manager(temp_dir.path(), MockRunner::ok(b""));
        let dir = manager.get_storage_dir();

        fs::write(dir.join("files_backup_20250101_000000.tar.gz"), "x").unwrap();

        let result = manager.restore_database("files_backup_20250101_000000.tar.gz").await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(BackupError::NotFound(_))));
    }

    #[test]
    fn test_classify_and_timestamp_parse() {
        assert_eq!(
            classify("db_backup_20250101_000000.sql.gz"),
            Some(BackupKind::Database)
        );
        assert_eq!(
            classify("files_backup_20250101_000000.tar.gz"),
            Some(BackupKind::Files)
        );
        assert_eq!(classify(".htaccess"), None);

        let ts = parse_timestamp_from_name("db_backup_20250615_143000.sql.gz", BackupKind::Database)
            .unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-06-15 14:30:00");

        assert!(parse_timestamp_from_name("db_backup_garbage.sql", BackupKind::Database).is_none());
    }
}
