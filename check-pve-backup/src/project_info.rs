/// check-pve-backup 项目信息模块
///
/// 项目元数据统一在这里定义，pve-backup-core 只提供技术性常量

/// 项目元数据（自动从 Cargo.toml 同步）
pub mod metadata {
    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    /// 用户友好的显示名称（手动维护）
    pub mod display {
        pub const CLI_FULL_NAME: &str = "Proxmox VE Backup Check";

        /// 详细描述，用于 --help
        pub const DESCRIPTION_LONG: &str = "读取 Proxmox VE 集群的备份任务，检查每台虚拟机在最近一个计划日是否有成功的 vzdump 备份日志，按 Nagios 约定输出一行状态并以 0/1/2/3 退出";
    }
}

/// 版本信息
pub mod version_info {
    /// CLI 版本
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 核心库版本
    pub const CORE_VERSION: &str = pve_backup_core::constants::version::CORE_VERSION;
}

/// 获取完整的版本信息字符串
pub fn get_full_version_string() -> String {
    format!(
        "{} v{} (core v{})",
        metadata::display::CLI_FULL_NAME,
        version_info::CLI_VERSION,
        version_info::CORE_VERSION
    )
}
