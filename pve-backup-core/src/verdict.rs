use crate::resolver::{StatusBoard, VmStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// 监控严重级别，顺序即优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    /// Nagios 约定的退出码
    pub fn exit_code(&self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// 单个虚拟机状态对应的级别
    pub fn of(status: VmStatus) -> Self {
        match status {
            VmStatus::Ok => Severity::Ok,
            VmStatus::Running | VmStatus::TooOld => Severity::Warning,
            VmStatus::NotChecked | VmStatus::NoBackup | VmStatus::Failed | VmStatus::NoLog => {
                Severity::Critical
            }
            VmStatus::Unreadable => Severity::Unknown,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 检查结论：整体级别 + 按状态分组的虚拟机
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub severity: Severity,
    pub groups: BTreeMap<VmStatus, Vec<u32>>,
}

impl Verdict {
    /// 汇总状态表
    pub fn from_board(board: &StatusBoard) -> Self {
        let mut groups: BTreeMap<VmStatus, Vec<u32>> = BTreeMap::new();
        let mut severity = Severity::Ok;

        for (vmid, status) in board.iter() {
            severity = severity.max(Severity::of(status));
            groups.entry(status).or_default().push(vmid);
        }

        Self { severity, groups }
    }

    pub fn exit_code(&self) -> i32 {
        self.severity.exit_code()
    }

    /// 分组摘要，例如 `ok: 100,101; failed: 102`
    pub fn summary(&self) -> String {
        if self.groups.is_empty() {
            return "没有启用的备份任务覆盖任何虚拟机".to_string();
        }
        self.groups
            .iter()
            .map(|(status, ids)| {
                let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
                format!("{}: {}", status, ids.join(","))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// 不含级别前缀的状态说明
    pub fn message(&self) -> String {
        let headline = match self.severity {
            Severity::Ok => None,
            Severity::Warning => Some("至少有一个备份尚未完成或早于预期"),
            Severity::Critical => Some("至少有一个备份未成功"),
            Severity::Unknown => Some("无法读取备份状态"),
        };
        match headline {
            Some(headline) => format!("{} - {}", headline, self.summary()),
            None => self.summary(),
        }
    }

    /// 监控系统读取的单行输出
    pub fn status_line(&self) -> String {
        format!("{} - {}", self.severity.label(), self.message())
    }
}
