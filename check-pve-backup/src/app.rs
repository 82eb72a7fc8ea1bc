use crate::cli::{Cli, OutputFormat};
use chrono::{Local, NaiveDateTime};
use pve_backup_core::{
    api::PveClient,
    config::ConnectionConfig,
    error::{ProbeError, Result},
    probe::ProbeInput,
    resolver::VmStatus,
    schedule::normalize_jobs,
    verdict::{Severity, Verdict},
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 一次检查的命令行应用
#[derive(Debug)]
pub struct CliApp {
    cli: Cli,
}

impl CliApp {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.cli.output
    }

    /// 确定连接参数：指定了配置文件时只读文件，否则使用 -u/-p/-s
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        match self.cli.file {
            Some(ref file) => {
                debug!("使用配置文件: {}", file.display());
                ConnectionConfig::load_from_file(file)
            }
            None => ConnectionConfig::from_args(
                self.cli.host.clone(),
                self.cli.user.clone(),
                self.cli.password.clone(),
            ),
        }
    }

    /// 检查所使用的当前时间
    pub fn now(&self) -> NaiveDateTime {
        self.cli.now.unwrap_or_else(|| Local::now().naive_local())
    }

    /// 从 Proxmox VE 收集任务、虚拟机清单和存储目录
    pub async fn gather(&self, client: &PveClient) -> Result<ProbeInput> {
        let records = client.get_backup_jobs().await?;
        let schedules = normalize_jobs(&records)?;
        let inventory = client.get_vm_inventory().await?;
        info!(
            "共 {} 个备份任务，{} 台虚拟机",
            schedules.len(),
            inventory.len()
        );

        let mut input = ProbeInput {
            schedules,
            inventory,
            storage_dirs: BTreeMap::new(),
            path_override: self.cli.path.clone(),
        };
        for storage in input.required_storages() {
            let dir = client.get_storage_dump_dir(&storage).await?;
            debug!("存储 {} -> {}", storage, dir.display());
            input.storage_dirs.insert(storage, dir);
        }
        Ok(input)
    }

    /// 执行完整检查
    pub async fn check(&self) -> Result<Verdict> {
        let config = self.connection_config()?;
        debug!("连接参数: {:?}", config);

        let client = PveClient::connect(&config).await?;
        let input = self.gather(&client).await?;
        input.check(self.now())
    }
}

/// JSON 输出结构
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    status: Severity,
    exit_code: i32,
    message: String,
    groups: &'a BTreeMap<VmStatus, Vec<u32>>,
}

/// 渲染检查结论
pub fn render_verdict(verdict: &Verdict, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => verdict.status_line(),
        OutputFormat::Json => to_json(&JsonReport {
            status: verdict.severity,
            exit_code: verdict.exit_code(),
            message: verdict.message(),
            groups: &verdict.groups,
        }),
    }
}

/// 渲染导致检查中止的错误，级别固定为 UNKNOWN
pub fn render_error(message: &str, format: OutputFormat) -> String {
    let severity = Severity::Unknown;
    match format {
        OutputFormat::Text => format!("{} - {}", severity.label(), message),
        OutputFormat::Json => to_json(&JsonReport {
            status: severity,
            exit_code: severity.exit_code(),
            message: message.to_string(),
            groups: &BTreeMap::new(),
        }),
    }
}

fn to_json(report: &JsonReport<'_>) -> String {
    serde_json::to_string(report).unwrap_or_else(|e| {
        let err = ProbeError::from(e);
        format!("{} - {}", Severity::Unknown.label(), err)
    })
}
