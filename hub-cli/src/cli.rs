use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 备份相关命令
#[derive(Subcommand, Debug)]
pub enum BackupCommand {
    /// 备份数据库
    Database,
    /// 备份应用文件
    Files,
    /// 执行完整备份（数据库 + 文件），成功后清理过期备份
    Full,
    /// 列出所有备份
    List,
    /// 显示备份统计信息
    Stats,
    /// 清理过期备份
    Clean {
        /// 保留天数（默认使用配置值）
        #[arg(long)]
        days: Option<u32>,
    },
    /// 从备份恢复数据库
    Restore {
        /// 备份文件名
        filename: String,
        /// 跳过确认
        #[arg(long)]
        force: bool,
    },
}

/// 日志相关命令
#[derive(Subcommand, Debug)]
pub enum LogsCommand {
    /// 查看最近日志
    Show {
        /// 日志分类
        #[arg(default_value = "application")]
        category: String,
        /// 显示条数
        #[arg(long, default_value = "50")]
        lines: usize,
        /// 按级别过滤 (debug, info, warning, error, critical)
        #[arg(long)]
        level: Option<String>,
    },
    /// 日志统计
    Stats {
        /// 日志分类
        #[arg(default_value = "application")]
        category: String,
        /// 统计窗口（小时）
        #[arg(long, default_value = "24")]
        hours: u32,
    },
    /// 导出日志到标准输出
    Export {
        /// 日志分类
        category: String,
        /// 导出格式
        #[arg(value_parser = ["csv", "json"])]
        format: String,
        /// 导出条数上限
        #[arg(long, default_value = "1000")]
        lines: usize,
    },
    /// 清理过期日志文件
    Clean {
        /// 最大保留天数
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

/// Campus Hub CLI - 门户备份与日志维护工具
#[derive(Parser)]
#[command(name = "hub-cli")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 显示配置和备份/日志状态
    Status,
    /// 首次使用时初始化，创建配置文件和目录结构
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 备份管理
    #[command(subcommand)]
    Backup(BackupCommand),
    /// 日志管理
    #[command(subcommand)]
    Logs(LogsCommand),
}
