mod search;
mod status;


use crate::log_classifier::BackupLogSource;
use crate::schedule::Schedule;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use tracing::debug;

// 重新导出公共接口
pub use search::{CatchUp, catch_up_dates, lookback_dates, search_newer, search_older};
pub use status::{StatusBoard, VmStatus};

/// 虚拟机备份状态解析器
///
/// 按任务顺序逐个处理，对每个虚拟机依次检查计划日、向前回溯、向后补查，
/// 多个任务覆盖同一个虚拟机时，已经成功的不再重复检查。
#[derive(Debug, Clone)]
pub struct VmStatusResolver {
    now: NaiveDateTime,
    inventory: BTreeSet<u32>,
}

impl VmStatusResolver {
    pub fn new(now: NaiveDateTime, inventory: BTreeSet<u32>) -> Self {
        Self { now, inventory }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// 建立初始状态表
    pub fn seed(&self, schedules: &[Schedule]) -> StatusBoard {
        StatusBoard::seed(schedules, &self.inventory)
    }

    /// 处理一个备份任务，返回计算出的计划日；未启用的任务返回 None
    pub fn resolve_schedule<S: BackupLogSource>(
        &self,
        board: &mut StatusBoard,
        schedule: &Schedule,
        source: &S,
    ) -> Option<NaiveDate> {
        if !schedule.enabled {
            debug!("备份任务 {} 未启用，跳过", schedule.label());
            return None;
        }

        let target = schedule.timing.target_date(self.now);
        debug!("------------");
        debug!("备份任务      : {}", schedule.label());
        debug!("存储          : {}", schedule.storage.as_deref().unwrap_or("-"));
        debug!("执行时间      : {}", schedule.timing);
        debug!("当前时间      : {}", self.now);
        debug!("计划日        : {}", target);

        for vmid in schedule.selection.resolve(&self.inventory) {
            let Some(current) = board.get(vmid) else {
                continue;
            };
            debug!("检查虚拟机: {}", vmid);
            let status = self.resolve_vm(current, vmid, target, source);
            board.set(vmid, status);
        }
        Some(target)
    }

    /// 计算单个虚拟机在某个计划日下的最终状态
    pub fn resolve_vm<S: BackupLogSource>(
        &self,
        current: VmStatus,
        vmid: u32,
        target: NaiveDate,
        source: &S,
    ) -> VmStatus {
        if current == VmStatus::Ok {
            debug!("虚拟机 {} 已在其他任务中检查成功，跳过", vmid);
            return current;
        }

        let mut status = current;
        let mut found = false;

        if let Some(on_target) = VmStatus::from_match(source.classify(vmid, target, false)) {
            status = on_target;
            found = true;
        }

        if !found {
            if let Some(date) = search_older(source, vmid, target) {
                debug!("虚拟机 {} 最近的成功备份在 {}，早于计划日", vmid, date);
                status = VmStatus::TooOld;
                found = true;
            }
        }

        if !found || status != VmStatus::Ok {
            let newer = search_newer(source, vmid, target, self.today(), status);
            status = newer.status;
            found |= newer.found;
        }

        if !found && status != VmStatus::Ok && !status.is_settled() {
            debug!("没有找到日志文件: {}", vmid);
            status = VmStatus::NoLog;
        }
        status
    }

    /// 依次处理全部任务
    pub fn resolve_all<S: BackupLogSource>(
        &self,
        schedules: &[Schedule],
        source_for: impl Fn(&Schedule) -> S,
    ) -> StatusBoard {
        let mut board = self.seed(schedules);
        for schedule in schedules {
            let source = source_for(schedule);
            self.resolve_schedule(&mut board, schedule, &source);
        }
        board
    }
}
