use crate::project_info::{metadata, version_info};
use chrono::NaiveDateTime;
use clap::{Parser, ValueEnum};
use pve_backup_core::constants::config::PASSWORD_ENV;
use std::path::PathBuf;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// 单行 Nagios 状态
    #[default]
    Text,
    /// JSON
    Json,
}

/// check-pve-backup - Proxmox VE 备份监控插件
#[derive(Parser, Debug)]
#[command(name = "check-pve-backup")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// API 用户，例如 monitoring@pve
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// API 密码
    #[arg(short = 'p', long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,

    /// Proxmox VE 主机名或地址
    #[arg(short = 's', long)]
    pub host: Option<String>,

    /// 凭据配置文件（TOML，[global] 段），优先于 -u/-p/-s
    ///
    /// 字符串值需要加引号，例如 host = "10.0.0.5"；不带引号的 INI 写法无法解析。
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// 直接指定 vzdump 日志目录，不再查询存储配置
    #[arg(short = 'P', long)]
    pub path: Option<PathBuf>,

    /// 输出调试日志到 stderr
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// 以指定时间作为当前时间，格式 YYYY-MM-DDTHH:MM
    #[arg(long, value_parser = parse_now)]
    pub now: Option<NaiveDateTime>,

    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

fn parse_now(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| format!("时间格式应为 YYYY-MM-DDTHH:MM: {e}"))
}
