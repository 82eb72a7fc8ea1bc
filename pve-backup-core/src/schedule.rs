use crate::calendar::Timing;
use crate::error::{ProbeError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// `GET /cluster/backup` 返回的原始备份任务
///
/// Proxmox 不同版本的字段类型并不统一（`0/1`、布尔值、字符串都出现过），
/// 因此宽松字段统一保留为 `Value`，在归一化时再解释。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupJobRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub enabled: Option<Value>,
    #[serde(default)]
    pub all: Option<Value>,
    #[serde(default)]
    pub vmid: Option<Value>,
    #[serde(default)]
    pub exclude: Option<Value>,
    /// PVE 7 及以上的日历事件
    #[serde(default)]
    pub schedule: Option<String>,
    /// 旧版星期字段
    #[serde(default)]
    pub dow: Option<String>,
    /// 旧版开始时间字段
    #[serde(default)]
    pub starttime: Option<String>,
}

impl BackupJobRecord {
    /// 缺少 enabled 时 Proxmox 默认启用
    pub fn is_enabled(&self) -> bool {
        self.enabled.as_ref().map(flag_value).unwrap_or(true)
    }
}

/// 备份任务覆盖的虚拟机范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmSelection {
    /// 显式列出的虚拟机
    List(BTreeSet<u32>),
    /// 资源清单中的全部虚拟机，排除 `exclude`
    All { exclude: BTreeSet<u32> },
}

impl VmSelection {
    /// 根据资源清单展开为具体的虚拟机集合
    pub fn resolve(&self, inventory: &BTreeSet<u32>) -> BTreeSet<u32> {
        match self {
            VmSelection::List(ids) => ids.clone(),
            VmSelection::All { exclude } => inventory.difference(exclude).copied().collect(),
        }
    }
}

/// 归一化后的备份计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub id: Option<String>,
    pub storage: Option<String>,
    pub enabled: bool,
    pub selection: VmSelection,
    pub timing: Timing,
}

impl Schedule {
    /// 从 API 原始记录归一化
    ///
    /// 时间表达式无效时返回错误；`vmid`、`exclude` 缺失或格式错误时按空集合处理。
    pub fn from_record(record: &BackupJobRecord) -> Result<Self> {
        let label = record.id.as_deref().unwrap_or("<unnamed>");
        let timing = match (&record.schedule, &record.dow, &record.starttime) {
            (Some(schedule), _, _) => Timing::from_calendar_event(schedule),
            (None, Some(dow), Some(starttime)) => Timing::from_legacy(dow, starttime),
            _ => Err(ProbeError::schedule("缺少 schedule 或 dow/starttime 字段")),
        }
        .map_err(|e| match e {
            ProbeError::Schedule(reason) => {
                ProbeError::schedule(format!("备份任务 {label}: {reason}"))
            }
            other => other,
        })?;

        let enabled = record.is_enabled();

        let selection = if record.all.as_ref().map(flag_value).unwrap_or(false) {
            VmSelection::All {
                exclude: id_list(record.exclude.as_ref(), label, "exclude"),
            }
        } else {
            VmSelection::List(id_list(record.vmid.as_ref(), label, "vmid"))
        };

        Ok(Self {
            id: record.id.clone(),
            storage: record.storage.clone(),
            enabled,
            selection,
            timing,
        })
    }

    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("<unnamed>")
    }
}

/// 归一化启用的备份任务，任意一个启用任务的时间表达式无效都会让整个检查失败
///
/// 未启用的任务不参与检查，也不解析其时间表达式。
pub fn normalize_jobs(records: &[BackupJobRecord]) -> Result<Vec<Schedule>> {
    records
        .iter()
        .filter(|record| {
            let enabled = record.is_enabled();
            if !enabled {
                debug!(
                    "备份任务 {} 未启用，跳过",
                    record.id.as_deref().unwrap_or("<unnamed>")
                );
            }
            enabled
        })
        .map(Schedule::from_record)
        .collect()
}

fn flag_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map(|n| n != 0).unwrap_or(false),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "yes" | "on"),
        _ => false,
    }
}

fn id_list(value: Option<&Value>, label: &str, field: &str) -> BTreeSet<u32> {
    let mut ids = BTreeSet::new();
    match value {
        None | Some(Value::Null) => {
            debug!("备份任务 {} 没有 {} 字段，按空列表处理", label, field);
        }
        Some(Value::Number(n)) => match n.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(id) => {
                ids.insert(id);
            }
            None => debug!("备份任务 {} 的 {} 无效: {}", label, field, n),
        },
        Some(Value::String(s)) => {
            for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
                match item.parse::<u32>() {
                    Ok(id) if id > 0 => {
                        ids.insert(id);
                    }
                    _ => debug!("备份任务 {} 的 {} 中忽略无效ID: '{}'", label, field, item),
                }
            }
        }
        Some(other) => {
            debug!("备份任务 {} 的 {} 格式无法识别: {}", label, field, other);
        }
    }
    ids
}
