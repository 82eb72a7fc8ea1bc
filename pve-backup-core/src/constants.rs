/// Proxmox VE API 相关常量
pub mod api {
    /// 默认API端口
    pub const DEFAULT_PORT: u16 = 8006;

    /// API路径前缀
    pub const PATH_PREFIX: &str = "/api2/json";

    /// 认证 cookie 名称
    pub const AUTH_COOKIE: &str = "PVEAuthCookie";

    /// API端点路径（相对于 PATH_PREFIX）
    pub mod endpoints {
        /// 登录获取 ticket
        pub const ACCESS_TICKET: &str = "/access/ticket";

        /// 集群备份计划列表
        pub const CLUSTER_BACKUP: &str = "/cluster/backup";

        /// 集群虚拟机资源列表
        pub const CLUSTER_VM_RESOURCES: &str = "/cluster/resources?type=vm";

        /// 存储配置（包含占位符）
        pub const STORAGE_CONFIG: &str = "/storage/{storage}";
    }

    /// HTTP相关常量
    pub mod http {
        /// 默认请求超时时间（秒）
        pub const DEFAULT_TIMEOUT: u64 = 30;

        /// User-Agent头
        pub const USER_AGENT: &str = "check-pve-backup/1.0";
    }
}

/// vzdump 日志相关常量
pub mod vzdump {
    /// 日志文件名前缀
    pub const LOG_PREFIX: &str = "vzdump-";

    /// 日志文件扩展名
    pub const LOG_EXTENSION: &str = ".log";

    /// 存储路径下的备份子目录
    pub const DUMP_DIR_NAME: &str = "dump";

    /// 日志文件名中的日期格式
    pub const DATE_FORMAT: &str = "%Y_%m_%d";

    /// 备份成功标记
    pub const MARKER_FINISHED: &str = "INFO: Finished Backup";

    /// 备份失败标记
    pub const MARKER_ERROR: &str = "ERROR: ";

    /// 备份进行中标记
    pub const MARKER_RUNNING: &str = "INFO: status:";
}

/// 检索窗口相关常量
pub mod search {
    /// 计划日未找到日志时向前回溯的天数
    pub const LOOKBACK_DAYS: u64 = 7;

    /// 计算计划日时最多回退的天数
    pub const MAX_WEEKDAY_STEPS: u32 = 7;
}

/// 配置文件相关常量
pub mod config {
    /// 配置文件中的连接段名称
    pub const GLOBAL_SECTION: &str = "global";

    /// 日志文件环境变量
    pub const LOG_FILE_ENV: &str = "CHECK_PVE_BACKUP_LOG_FILE";

    /// 密码环境变量
    pub const PASSWORD_ENV: &str = "PVE_PASSWORD";
}

/// 版本信息
pub mod version {
    /// 核心库版本
    pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
}
