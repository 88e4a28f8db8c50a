/// Hub CLI 项目信息模块
///
/// hub-cli 是面向用户的主程序，项目元数据统一在这里定义；
/// hub-core 作为内部库，只提供技术性常量

/// 项目元数据（自动从 hub-cli 的 Cargo.toml 同步）
pub mod metadata {
    /// 项目名称（自动从 Cargo.toml 同步）
    pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

    /// 项目描述（自动从 Cargo.toml 同步）
    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    /// 项目作者（自动从 Cargo.toml 同步）
    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    /// 项目许可证（自动从 Cargo.toml 同步）
    pub const PROJECT_LICENSE: &str = env!("CARGO_PKG_LICENSE");

    /// 项目仓库地址（自动从 Cargo.toml 同步）
    pub const PROJECT_REPOSITORY: &str = env!("CARGO_PKG_REPOSITORY");

    /// 用户友好的显示名称（手动维护，用于界面显示）
    pub mod display {
        /// 用户友好的项目名称
        pub const FRIENDLY_NAME: &str = "Campus Hub";

        /// CLI 工具的完整名称
        pub const CLI_FULL_NAME: &str = "Campus Hub CLI";

        /// 项目详细描述（比 Cargo.toml 中的描述更详细）
        pub const DESCRIPTION_LONG: &str =
            "校园门户运维工具，提供数据库与应用文件的完整备份、按保留期清理、数据库恢复，以及分类日志的轮转、检索、统计和导出";
    }
}

/// 版本信息
pub mod version_info {
    /// CLI 版本（自动从 Cargo.toml 同步）
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 核心库版本（从 hub-core 获取）
    pub const CORE_VERSION: &str = hub_core::constants::version::CORE_VERSION;
}
