use crate::error::{ProbeError, Result};
use crate::log_classifier::LogDirectory;
use crate::resolver::{StatusBoard, VmStatusResolver};
use crate::schedule::Schedule;
use crate::verdict::Verdict;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

/// 一次检查所需的全部输入
#[derive(Debug, Clone, Default)]
pub struct ProbeInput {
    pub schedules: Vec<Schedule>,
    pub inventory: BTreeSet<u32>,
    /// 存储名 -> vzdump 日志目录
    pub storage_dirs: BTreeMap<String, PathBuf>,
    /// 命令行指定的日志目录，优先于存储配置
    pub path_override: Option<PathBuf>,
}

impl ProbeInput {
    /// 启用的任务所引用、需要查询本地路径的存储
    pub fn required_storages(&self) -> BTreeSet<String> {
        if self.path_override.is_some() {
            return BTreeSet::new();
        }
        self.schedules
            .iter()
            .filter(|s| s.enabled)
            .filter_map(|s| s.storage.clone())
            .collect()
    }

    /// 任务对应的日志目录
    pub fn log_dir(&self, schedule: &Schedule) -> Result<PathBuf> {
        if let Some(ref path) = self.path_override {
            return Ok(path.clone());
        }
        let storage = schedule.storage.as_deref().ok_or_else(|| {
            ProbeError::storage(format!("备份任务 {} 没有指定存储", schedule.label()))
        })?;
        self.storage_dirs.get(storage).cloned().ok_or_else(|| {
            ProbeError::storage(format!("无法确定存储 {} 的备份目录", storage))
        })
    }

    /// 计算状态表；任何启用任务的目录无法确定时整体失败
    pub fn run(&self, now: NaiveDateTime) -> Result<StatusBoard> {
        // 日志目录只取决于存储
        let mut dirs: BTreeMap<String, PathBuf> = BTreeMap::new();
        for schedule in self.schedules.iter().filter(|s| s.enabled) {
            let dir = self.log_dir(schedule)?;
            debug!("备份任务 {} 日志目录: {}", schedule.label(), dir.display());
            dirs.insert(schedule.storage.clone().unwrap_or_default(), dir);
        }

        let resolver = VmStatusResolver::new(now, self.inventory.clone());
        // 未启用的任务不会读取目录
        Ok(resolver.resolve_all(&self.schedules, |schedule| {
            let storage = schedule.storage.as_deref().unwrap_or_default();
            LogDirectory::new(dirs.get(storage).cloned().unwrap_or_default())
        }))
    }

    /// 计算最终结论
    pub fn check(&self, now: NaiveDateTime) -> Result<Verdict> {
        let board = self.run(now)?;
        Ok(Verdict::from_board(&board))
    }
}
