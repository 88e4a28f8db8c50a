use crate::config::LogConfig;
use crate::constants::{access, logs};
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone};
use fs2::FileExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 日志级别
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// 日志行中使用的大写级别名
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// 解析级别名（大小写不敏感）
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARNING" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            "CRITICAL" => Some(LogLevel::Critical),
            _ => None,
        }
    }
}

/// 结构化日志上下文
pub type LogContext = serde_json::Map<String, serde_json::Value>;

/// 一条结构化日志记录
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
    pub category: String,
}

/// 日志导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

/// 单个分类的日志统计
#[derive(Debug, Clone, Serialize)]
pub struct LogStats {
    pub category: String,
    pub window_hours: u32,
    pub total: usize,
    pub debug: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub critical: usize,
    /// 时间窗口内的 Error/Critical 条数
    pub recent_errors: usize,
}

/// 日志行解析正则，格式: [时间戳] 级别: 消息 {json上下文}
static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\] ([A-Z]+): (.*?)( \{.*\})?$")
        .expect("日志行正则不合法")
});

/// 分类日志写入器
///
/// 向按分类命名的日志文件追加单行结构化记录，写入前检查大小并按需轮转。
/// 日志写入是尽力而为的：任何内部错误都被吞掉，绝不影响调用方的主流程。
#[derive(Debug, Clone)]
pub struct LogWriter {
    dir: PathBuf,
    max_file_size: u64,
    max_files: u32,
}

impl LogWriter {
    /// 创建日志写入器，并确保日志目录和访问标记文件存在
    pub fn new(config: &LogConfig) -> Self {
        let writer = Self {
            dir: PathBuf::from(&config.dir),
            max_file_size: config.max_file_size,
            max_files: config.max_files,
        };

        if let Err(e) = access::ensure_protected_dir(&writer.dir) {
            tracing::debug!("创建日志目录失败（忽略）: {e}");
        }

        writer
    }

    /// 获取日志目录
    pub fn get_log_dir(&self) -> &Path {
        &self.dir
    }

    /// 写入一条日志
    ///
    /// Error 及以上级别会同时镜像到进程诊断通道。
    pub fn log(&self, level: LogLevel, message: &str, context: LogContext, category: &str) {
        if level >= LogLevel::Error {
            tracing::error!(category = category, "{}", message);
        }

        if let Err(e) = self.try_log(level, message, &context, category) {
            tracing::debug!("日志写入失败（忽略）: {e}");
        }
    }

    /// 记录用户操作
    pub fn log_user_activity(
        &self,
        user_id: i64,
        username: &str,
        action: &str,
        ip: Option<&str>,
        user_agent: Option<&str>,
    ) {
        let mut context = LogContext::new();
        context.insert("user_id".to_string(), json!(user_id));
        context.insert("username".to_string(), json!(username));
        context.insert("action".to_string(), json!(action));
        if let Some(ip) = ip {
            context.insert("ip".to_string(), json!(ip));
        }
        if let Some(ua) = user_agent {
            context.insert("user_agent".to_string(), json!(ua));
        }

        self.log(
            LogLevel::Info,
            &format!("用户操作: {action}"),
            context,
            logs::CATEGORY_ACTIVITY,
        );
    }

    /// 记录安全事件
    pub fn log_security(
        &self,
        event: &str,
        level: LogLevel,
        ip: Option<&str>,
        details: LogContext,
    ) {
        let mut context = details;
        context.insert("event".to_string(), json!(event));
        if let Some(ip) = ip {
            context.insert("ip".to_string(), json!(ip));
        }

        self.log(
            level,
            &format!("安全事件: {event}"),
            context,
            logs::CATEGORY_SECURITY,
        );
    }

    /// 记录 API 访问，级别由 HTTP 状态码推导
    pub fn log_api(
        &self,
        endpoint: &str,
        method: &str,
        status_code: u16,
        duration_ms: u64,
        ip: Option<&str>,
    ) {
        let level = if status_code >= 500 {
            LogLevel::Error
        } else if status_code >= 400 {
            LogLevel::Warning
        } else {
            LogLevel::Info
        };

        let mut context = LogContext::new();
        context.insert("endpoint".to_string(), json!(endpoint));
        context.insert("method".to_string(), json!(method));
        context.insert("status_code".to_string(), json!(status_code));
        context.insert("duration_ms".to_string(), json!(duration_ms));
        if let Some(ip) = ip {
            context.insert("ip".to_string(), json!(ip));
        }

        self.log(
            level,
            &format!("{method} {endpoint} -> {status_code}"),
            context,
            logs::CATEGORY_API,
        );
    }

    /// 记录数据库操作
    pub fn log_database(&self, operation: &str, detail: &str, duration_ms: u64, success: bool) {
        let level = if success { LogLevel::Info } else { LogLevel::Error };

        let mut context = LogContext::new();
        context.insert("operation".to_string(), json!(operation));
        context.insert("duration_ms".to_string(), json!(duration_ms));
        context.insert("success".to_string(), json!(success));

        self.log(
            level,
            &format!("数据库操作 {operation}: {detail}"),
            context,
            logs::CATEGORY_DATABASE,
        );
    }

    /// 记录性能指标，超过阈值时升级为 Warning
    pub fn log_performance(&self, metric: &str, value: f64, threshold: f64) {
        let level = if value > threshold {
            LogLevel::Warning
        } else {
            LogLevel::Info
        };

        let mut context = LogContext::new();
        context.insert("metric".to_string(), json!(metric));
        context.insert("value".to_string(), json!(value));
        context.insert("threshold".to_string(), json!(threshold));

        self.log(
            level,
            &format!("性能指标 {metric}: {value:.2} (阈值 {threshold:.2})"),
            context,
            logs::CATEGORY_PERFORMANCE,
        );
    }

    /// 读取最近的日志条目，最新的在前
    ///
    /// 先截取文件末尾 `max_lines` 行再解析，无法解析的行被静默丢弃；
    /// `level_filter` 在截取之后按级别过滤。
    pub fn get_logs(
        &self,
        category: &str,
        max_lines: usize,
        level_filter: Option<LogLevel>,
    ) -> Vec<LogEntry> {
        let content = match fs::read_to_string(self.active_path(category)) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(max_lines);

        let mut entries: Vec<LogEntry> = lines[start..]
            .iter()
            .filter_map(|line| parse_line(line, category))
            .collect();

        if let Some(level) = level_filter {
            entries.retain(|e| e.level == level);
        }

        entries.reverse();
        entries
    }

    /// 统计一个分类的日志：全量按级别计数，外加时间窗口内的错误条数
    pub fn get_log_stats(&self, category: &str, window_hours: u32) -> LogStats {
        let mut stats = LogStats {
            category: category.to_string(),
            window_hours,
            total: 0,
            debug: 0,
            info: 0,
            warning: 0,
            error: 0,
            critical: 0,
            recent_errors: 0,
        };

        let content = match fs::read_to_string(self.active_path(category)) {
            Ok(content) => content,
            Err(_) => return stats,
        };

        let cutoff = Local::now() - Duration::hours(window_hours as i64);

        for entry in content.lines().filter_map(|line| parse_line(line, category)) {
            stats.total += 1;
            match entry.level {
                LogLevel::Debug => stats.debug += 1,
                LogLevel::Info => stats.info += 1,
                LogLevel::Warning => stats.warning += 1,
                LogLevel::Error => stats.error += 1,
                LogLevel::Critical => stats.critical += 1,
            }
            if entry.level >= LogLevel::Error && entry.timestamp >= cutoff {
                stats.recent_errors += 1;
            }
        }

        stats
    }

    /// 删除超过保留期的日志文件（含活动文件和轮转代），返回删除数量
    pub fn clean_old_logs(&self, max_age_days: u32) -> usize {
        let cutoff =
            SystemTime::now() - std::time::Duration::from_secs(max_age_days as u64 * 86400);

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("log") {
                continue;
            }

            let modified = entry.metadata().and_then(|m| m.modified());
            if let Ok(modified) = modified {
                if modified < cutoff && fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }

        removed
    }

    /// 导出最近的日志条目为 CSV 或 JSON 文本
    pub fn export_logs(&self, category: &str, format: ExportFormat, max_lines: usize) -> String {
        let entries = self.get_logs(category, max_lines, None);

        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
            }
            ExportFormat::Csv => {
                let mut out = String::from("timestamp,level,category,message,context\n");
                for entry in &entries {
                    let context = if entry.context.is_empty() {
                        String::new()
                    } else {
                        serde_json::to_string(&entry.context).unwrap_or_default()
                    };
                    out.push_str(&format!(
                        "{},{},{},{},{}\n",
                        entry.timestamp.format(logs::LINE_TIMESTAMP_FORMAT),
                        entry.level.as_str(),
                        csv_escape(&entry.category),
                        csv_escape(&entry.message),
                        csv_escape(&context),
                    ));
                }
                out
            }
        }
    }

    /// 实际写入：按需轮转后在排它锁下追加一行
    fn try_log(
        &self,
        level: LogLevel,
        message: &str,
        context: &LogContext,
        category: &str,
    ) -> std::io::Result<()> {
        access::ensure_protected_dir(&self.dir)?;

        let active = self.active_path(category);
        self.rotate_if_needed(&active, category)?;

        let line = render_line(Local::now(), level, message, context);

        let file = OpenOptions::new().create(true).append(true).open(&active)?;
        file.lock_exclusive()?;
        // 锁随文件句柄关闭释放
        (&file).write_all(line.as_bytes())
    }

    /// 活动文件达到大小阈值时轮转：删除最旧代，其余代序号上移，活动文件变为第 1 代
    fn rotate_if_needed(&self, active: &Path, category: &str) -> std::io::Result<()> {
        let size = match fs::metadata(active) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size < self.max_file_size {
            return Ok(());
        }

        if self.max_files == 0 {
            return fs::remove_file(active);
        }

        let oldest = self.generation_path(category, self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for n in (1..self.max_files).rev() {
            let from = self.generation_path(category, n);
            if from.exists() {
                fs::rename(&from, self.generation_path(category, n + 1))?;
            }
        }

        fs::rename(active, self.generation_path(category, 1))
    }

    fn active_path(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{category}.log"))
    }

    fn generation_path(&self, category: &str, n: u32) -> PathBuf {
        self.dir.join(format!("{category}.{n}.log"))
    }
}

/// 渲染单行日志: [时间戳] 级别: 消息 {json上下文}
///
/// 上下文为空时整体省略（无尾随空格）；消息中的换行替换为空格，
/// 保证行式解析不被破坏。
fn render_line(
    timestamp: DateTime<Local>,
    level: LogLevel,
    message: &str,
    context: &LogContext,
) -> String {
    let message = message.replace(['\n', '\r'], " ");
    let timestamp = timestamp.format(logs::LINE_TIMESTAMP_FORMAT);

    if context.is_empty() {
        format!("[{}] {}: {}\n", timestamp, level.as_str(), message)
    } else {
        let context = serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string());
        format!("[{}] {}: {} {}\n", timestamp, level.as_str(), message, context)
    }
}

/// 解析一行日志，格式不符时返回 None
///
/// 行尾疑似上下文但不是合法 JSON 时，整段并入消息而不是丢弃该行。
fn parse_line(line: &str, category: &str) -> Option<LogEntry> {
    let caps = LINE_RE.captures(line)?;

    let naive = NaiveDateTime::parse_from_str(&caps[1], logs::LINE_TIMESTAMP_FORMAT).ok()?;
    let timestamp = Local.from_local_datetime(&naive).earliest()?;
    let level = LogLevel::parse(&caps[2])?;

    let (message, context) = match caps.get(4) {
        Some(raw) => match serde_json::from_str::<LogContext>(raw.as_str().trim_start()) {
            Ok(map) => (caps[3].to_string(), map),
            Err(_) => (format!("{}{}", &caps[3], raw.as_str()), LogContext::new()),
        },
        None => (caps[3].to_string(), LogContext::new()),
    };

    Some(LogEntry {
        timestamp,
        level,
        message,
        context,
        category: category.to_string(),
    })
}

/// CSV 字段转义
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
