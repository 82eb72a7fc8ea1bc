use super::status::VmStatus;
use crate::constants::search::LOOKBACK_DAYS;
use crate::log_classifier::BackupLogSource;
use chrono::{Days, NaiveDate};
use tracing::debug;

/// 回溯检索的候选日期：`target-1` 到 `target-7`
pub fn lookback_dates(target: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (1..=LOOKBACK_DAYS).map_while(move |n| target.checked_sub_days(Days::new(n)))
}

/// 补查的候选日期：`target+1` 到 `today`（含）
pub fn catch_up_dates(target: NaiveDate, today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    target
        .iter_days()
        .skip(1)
        .take_while(move |date| *date <= today)
}

/// 在计划日之前寻找最近一次成功的备份
pub fn search_older<S: BackupLogSource>(
    source: &S,
    vmid: u32,
    target: NaiveDate,
) -> Option<NaiveDate> {
    lookback_dates(target).find(|date| {
        let found = source.classify(vmid, *date, true);
        if found.found && !found.is_ok() {
            debug!("{} 的日志不是成功记录，继续往前找", date);
        }
        found.is_ok()
    })
}

/// 补查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchUp {
    pub status: VmStatus,
    pub found: bool,
}

/// 计划日之后的日志：有匹配就覆盖状态，没有匹配保留前一天的状态，成功后停止
pub fn search_newer<S: BackupLogSource>(
    source: &S,
    vmid: u32,
    target: NaiveDate,
    today: NaiveDate,
    status: VmStatus,
) -> CatchUp {
    let mut result = CatchUp {
        status,
        found: false,
    };

    for date in catch_up_dates(target, today) {
        if result.status == VmStatus::Ok {
            break;
        }
        debug!("检查下一天: {}", date);
        if let Some(status) = VmStatus::from_match(source.classify(vmid, date, false)) {
            result.status = status;
            result.found = true;
        }
    }
    result
}
