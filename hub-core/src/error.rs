use thiserror::Error;

pub type Result<T> = std::result::Result<T, HubError>;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("任务执行错误: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("目录遍历错误: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("路径错误: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("备份操作失败: {0}")]
    Backup(String),

    #[error("日志操作失败: {0}")]
    Log(String),

    #[error("自定义错误: {0}")]
    Custom(String),

    #[error("配置文件未找到")]
    ConfigNotFound,
}

impl HubError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn backup(msg: impl Into<String>) -> Self {
        Self::Backup(msg.into())
    }

    pub fn log(msg: impl Into<String>) -> Self {
        Self::Log(msg.into())
    }
}

/// 单次备份/恢复操作的失败分类
///
/// 备份管理器的公开操作不向外抛错，失败以该类型嵌入操作结果返回。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackupError {
    #[error("外部命令执行失败: {0}")]
    Subprocess(String),

    #[error("备份产物缺失或为空: {0}")]
    EmptyArtifact(String),

    #[error("备份文件不存在: {0}")]
    NotFound(String),

    #[error("IO 错误: {0}")]
    Io(String),
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        BackupError::Io(err.to_string())
    }
}
