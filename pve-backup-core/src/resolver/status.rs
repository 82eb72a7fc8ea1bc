use crate::log_classifier::{LogMatch, LogOutcome};
use crate::schedule::Schedule;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 虚拟机备份状态，声明顺序即展示顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum VmStatus {
    /// 计划日备份成功
    #[serde(rename = "ok")]
    Ok,
    /// 备份仍在进行
    #[serde(rename = "running")]
    Running,
    /// 找到成功的备份，但早于计划日
    #[serde(rename = "2old")]
    TooOld,
    /// 尚未检查
    #[serde(rename = "nochk")]
    NotChecked,
    /// 有日志但没有完成记录
    #[serde(rename = "nobak")]
    NoBackup,
    /// 备份报错
    #[serde(rename = "failed")]
    Failed,
    /// 检索窗口内没有任何日志
    #[serde(rename = "nolog")]
    NoLog,
    /// 找到日志但全部无法读取
    #[serde(rename = "unknown")]
    Unreadable,
}

impl VmStatus {
    pub const ALL: [VmStatus; 8] = [
        VmStatus::Ok,
        VmStatus::Running,
        VmStatus::TooOld,
        VmStatus::NotChecked,
        VmStatus::NoBackup,
        VmStatus::Failed,
        VmStatus::NoLog,
        VmStatus::Unreadable,
    ];

    /// 状态码
    pub fn code(&self) -> &'static str {
        match self {
            VmStatus::Ok => "ok",
            VmStatus::Running => "running",
            VmStatus::TooOld => "2old",
            VmStatus::NotChecked => "nochk",
            VmStatus::NoBackup => "nobak",
            VmStatus::Failed => "failed",
            VmStatus::NoLog => "nolog",
            VmStatus::Unreadable => "unknown",
        }
    }

    /// 把一次扫描结果转换为状态；没有匹配的文件时返回 None
    pub fn from_match(found: LogMatch) -> Option<Self> {
        if !found.found {
            return None;
        }
        Some(found.outcome.map(Self::from).unwrap_or(VmStatus::Unreadable))
    }

    /// 已经有明确结论的状态，不会再被改写为 `nolog`
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            VmStatus::Running
                | VmStatus::TooOld
                | VmStatus::NoBackup
                | VmStatus::Failed
                | VmStatus::Unreadable
        )
    }
}

impl From<LogOutcome> for VmStatus {
    fn from(outcome: LogOutcome) -> Self {
        match outcome {
            LogOutcome::Ok => VmStatus::Ok,
            LogOutcome::Running => VmStatus::Running,
            LogOutcome::NoBackup => VmStatus::NoBackup,
            LogOutcome::Failed => VmStatus::Failed,
        }
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 一次检查中所有虚拟机的状态表
///
/// 只由 [`super::VmStatusResolver`] 修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBoard {
    entries: BTreeMap<u32, VmStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为所有启用任务覆盖的虚拟机建立 `nochk` 初始状态
    pub fn seed(schedules: &[Schedule], inventory: &BTreeSet<u32>) -> Self {
        let mut board = Self::new();
        for schedule in schedules.iter().filter(|s| s.enabled) {
            for vmid in schedule.selection.resolve(inventory) {
                board.track(vmid);
            }
        }
        board
    }

    /// 登记一个待检查的虚拟机，已存在时不改变状态
    pub fn track(&mut self, vmid: u32) {
        self.entries.entry(vmid).or_insert(VmStatus::NotChecked);
    }

    pub fn get(&self, vmid: u32) -> Option<VmStatus> {
        self.entries.get(&vmid).copied()
    }

    pub(crate) fn set(&mut self, vmid: u32, status: VmStatus) {
        self.entries.insert(vmid, status);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按虚拟机ID升序遍历
    pub fn iter(&self) -> impl Iterator<Item = (u32, VmStatus)> + '_ {
        self.entries.iter().map(|(vmid, status)| (*vmid, *status))
    }
}
