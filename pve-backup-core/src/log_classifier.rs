use crate::constants::vzdump;
use chrono::NaiveDate;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 从日志最后一行得出的备份结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// 备份完成
    Ok,
    /// 备份正在进行
    Running,
    /// 有日志但没有完成记录
    NoBackup,
    /// 备份报错
    Failed,
}

impl LogOutcome {
    /// 根据日志最后一行判断结果
    pub fn from_last_line(line: &str) -> Self {
        if line.contains(vzdump::MARKER_FINISHED) {
            LogOutcome::Ok
        } else if line.contains(vzdump::MARKER_ERROR) {
            LogOutcome::Failed
        } else if line.contains(vzdump::MARKER_RUNNING) {
            LogOutcome::Running
        } else {
            LogOutcome::NoBackup
        }
    }
}

/// 一次目录扫描的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogMatch {
    /// 至少有一个文件名匹配（无论能否读取）
    pub found: bool,
    /// 可读文件得出的结果；全部不可读时为 None
    pub outcome: Option<LogOutcome>,
}

impl LogMatch {
    pub fn is_ok(&self) -> bool {
        self.outcome == Some(LogOutcome::Ok)
    }
}

/// 按虚拟机和日期查询备份日志的来源
pub trait BackupLogSource {
    /// `looking_older` 只影响诊断日志，不影响结果
    fn classify(&self, vmid: u32, date: NaiveDate, looking_older: bool) -> LogMatch;
}

/// 一个 vzdump 备份目录
#[derive(Debug, Clone)]
pub struct LogDirectory {
    path: PathBuf,
}

impl LogDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BackupLogSource for LogDirectory {
    fn classify(&self, vmid: u32, date: NaiveDate, looking_older: bool) -> LogMatch {
        classify(&self.path, vmid, date, looking_older)
    }
}

/// 日志文件名中的日期部分，例如 `2024_03_01`
pub fn log_date_stamp(date: NaiveDate) -> String {
    date.format(vzdump::DATE_FORMAT).to_string()
}

/// 匹配 `vzdump-<任意>-<vmid>-<日期><任意>.log` 的文件名
pub fn log_file_pattern(vmid: u32, date_stamp: &str) -> Regex {
    let pattern = format!(
        "^{}.*-{}-{}.*{}$",
        regex::escape(vzdump::LOG_PREFIX),
        vmid,
        regex::escape(date_stamp),
        regex::escape(vzdump::LOG_EXTENSION)
    );
    // 只有数字和转义后的常量，正则必然合法
    Regex::new(&pattern).unwrap_or_else(|_| unreachable!("无效的日志文件名正则: {pattern}"))
}

/// 扫描目录（不递归），按匹配文件的最后一行判断该虚拟机在该日期的备份结果
///
/// 文件按文件名顺序处理；一旦得到 `Ok` 就不会再被后续文件降级。
pub fn classify(dir: &Path, vmid: u32, date: NaiveDate, looking_older: bool) -> LogMatch {
    let date_stamp = log_date_stamp(date);
    let pattern = log_file_pattern(vmid, &date_stamp);
    debug!(
        "检查日志: {}/{}*-{}-{}*{}",
        dir.display(),
        vzdump::LOG_PREFIX,
        vmid,
        date_stamp,
        vzdump::LOG_EXTENSION
    );

    let mut result = LogMatch::default();
    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("无法读取目录项: {}", e);
                continue;
            }
        };
        let file_name = entry.file_name().to_string_lossy();
        if !pattern.is_match(&file_name) {
            continue;
        }

        debug!("匹配到日志文件: {}", file_name);
        result.found = true;
        if looking_older {
            debug!("找到备份日志，但日期早于预期: {}", vmid);
        }

        let Some(line) = read_last_line(entry.path()) else {
            debug!("日志文件无法读取，跳过: {}", entry.path().display());
            continue;
        };
        debug!("最后一行: {}", line.trim_end());

        let outcome = LogOutcome::from_last_line(&line);
        if result.is_ok() {
            continue;
        }
        match outcome {
            LogOutcome::Ok => debug!("备份成功: {}", vmid),
            LogOutcome::Failed => debug!("备份失败: {}", vmid),
            LogOutcome::Running => debug!("备份正在进行: {}", vmid),
            LogOutcome::NoBackup => debug!("日志中没有完成记录: {}", vmid),
        }
        result.outcome = Some(outcome);
    }

    result
}

/// 读取文件最后一行；文件无法打开、为空或读取出错时返回 None
pub fn read_last_line(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut last = None;
    for line in BufReader::new(file).lines() {
        last = Some(line.ok()?);
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    fn write_log(dir: &Path, name: &str, lines: &[&str]) {
        fs::write(dir.join(name), lines.join("\n") + "\n").unwrap();
    }

    #[test]
    fn test_file_pattern() {
        let pattern = log_file_pattern(100, "2024_03_01");
        assert!(pattern.is_match("vzdump-qemu-100-2024_03_01-02_00_03.log"));
        assert!(pattern.is_match("vzdump-lxc-100-2024_03_01-23_59_59.log"));
        assert!(!pattern.is_match("vzdump-qemu-1100-2024_03_01-02_00_03.log"));
        assert!(!pattern.is_match("vzdump-qemu-100-2024_03_02-02_00_03.log"));
        assert!(!pattern.is_match("vzdump-qemu-100-2024_03_01-02_00_03.vma.zst"));
        assert!(!pattern.is_match("other-qemu-100-2024_03_01.log"));
    }

    #[test]
    fn test_outcome_from_last_line() {
        assert_eq!(
            LogOutcome::from_last_line("2024-03-01 02:10:00 INFO: Finished Backup of VM 100 (00:10:00)"),
            LogOutcome::Ok
        );
        assert_eq!(
            LogOutcome::from_last_line("2024-03-01 02:10:00 ERROR: Backup of VM 100 failed"),
            LogOutcome::Failed
        );
        assert_eq!(
            LogOutcome::from_last_line("INFO: status: 45% (10.0 GiB of 22.0 GiB)"),
            LogOutcome::Running
        );
        assert_eq!(LogOutcome::from_last_line("INFO: starting new backup job"), LogOutcome::NoBackup);
    }

    #[test]
    fn test_classify_uses_last_line_only() {
        let dir = tempdir().unwrap();
        write_log(
            dir.path(),
            "vzdump-qemu-100-2024_03_01-02_00_00.log",
            &["ERROR: something earlier", "INFO: Finished Backup of VM 100"],
        );
        let m = classify(dir.path(), 100, day("2024-03-01"), false);
        assert!(m.found);
        assert_eq!(m.outcome, Some(LogOutcome::Ok));
    }

    #[test]
    fn test_classify_no_match() {
        let dir = tempdir().unwrap();
        write_log(dir.path(), "vzdump-qemu-101-2024_03_01-02_00_00.log", &["INFO: Finished Backup"]);
        let m = classify(dir.path(), 100, day("2024-03-01"), false);
        assert_eq!(m, LogMatch::default());
    }

    #[test]
    fn test_classify_missing_directory() {
        let dir = tempdir().unwrap();
        let m = classify(&dir.path().join("missing"), 100, day("2024-03-01"), false);
        assert!(!m.found);
    }

    #[test]
    fn test_ok_is_never_downgraded() {
        let dir = tempdir().unwrap();
        // 按文件名排序，成功的日志在前，失败的在后
        write_log(dir.path(), "vzdump-qemu-100-2024_03_01-01_00_00.log", &["INFO: Finished Backup"]);
        write_log(dir.path(), "vzdump-qemu-100-2024_03_01-22_00_00.log", &["ERROR: job aborted"]);
        let m = classify(dir.path(), 100, day("2024-03-01"), false);
        assert_eq!(m.outcome, Some(LogOutcome::Ok));
    }

    #[test]
    fn test_later_ok_upgrades_earlier_failure() {
        let dir = tempdir().unwrap();
        write_log(dir.path(), "vzdump-qemu-100-2024_03_01-01_00_00.log", &["ERROR: job aborted"]);
        write_log(dir.path(), "vzdump-qemu-100-2024_03_01-22_00_00.log", &["INFO: Finished Backup"]);
        let m = classify(dir.path(), 100, day("2024-03-01"), true);
        assert_eq!(m.outcome, Some(LogOutcome::Ok));
    }

    #[test]
    fn test_unreadable_match_counts_as_found() {
        let dir = tempdir().unwrap();
        // 空文件没有最后一行
        fs::write(dir.path().join("vzdump-qemu-100-2024_03_01-02_00_00.log"), "").unwrap();
        let m = classify(dir.path(), 100, day("2024-03-01"), false);
        assert!(m.found);
        assert_eq!(m.outcome, None);
    }

    #[test]
    fn test_non_utf8_log_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("vzdump-qemu-100-2024_03_01-02_00_00.log"),
            [0xff, 0xfe, b'\n', 0xff],
        )
        .unwrap();
        write_log(dir.path(), "vzdump-qemu-100-2024_03_01-03_00_00.log", &["INFO: status: 10%"]);
        let m = classify(dir.path(), 100, day("2024-03-01"), false);
        assert!(m.found);
        assert_eq!(m.outcome, Some(LogOutcome::Running));
    }

    #[test]
    fn test_log_directory_source() {
        let dir = tempdir().unwrap();
        write_log(dir.path(), "vzdump-lxc-105-2024_03_01-02_00_00.log", &["INFO: backup ended"]);
        let source = LogDirectory::new(dir.path());
        assert_eq!(source.path(), dir.path());
        let m = source.classify(105, day("2024-03-01"), false);
        assert_eq!(m.outcome, Some(LogOutcome::NoBackup));
    }
}
