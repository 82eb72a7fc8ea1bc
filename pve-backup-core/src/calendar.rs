use crate::constants::search::MAX_WEEKDAY_STEPS;
use crate::error::{ProbeError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::fmt;

/// 一周七天，按周一开始排列
pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// 星期集合（按位存储，bit0 = 周一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const ALL: WeekdaySet = WeekdaySet(0b111_1111);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        ALL_WEEKDAYS.into_iter().filter(move |day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(weekday_token).collect();
        write!(f, "{}", names.join(","))
    }
}

/// 星期的三字母小写缩写（与 Proxmox 配置一致）
pub fn weekday_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    ALL_WEEKDAYS
        .into_iter()
        .find(|day| weekday_token(*day).eq_ignore_ascii_case(token.trim()))
}

/// 归一化后的备份时间：执行的星期集合 + 开始时间
///
/// 两种配置写法（旧版 `dow` + `starttime` 与日历事件字符串）都会先转换成这个结构，
/// 计划日计算只依赖它。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub days: WeekdaySet,
    pub start: NaiveTime,
}

impl Timing {
    /// 创建时间规则，星期集合不能为空
    pub fn new(days: WeekdaySet, start: NaiveTime) -> Result<Self> {
        if days.is_empty() {
            return Err(ProbeError::schedule("星期集合为空"));
        }
        Ok(Self { days, start })
    }

    /// 解析日历事件写法，例如 `sat 02:00`、`mon..fri 21:30`、`*`、`02:00`
    pub fn from_calendar_event(expr: &str) -> Result<Self> {
        parse_calendar_event(expr)
    }

    /// 解析旧版写法：`dow = "mon,wed"`，`starttime = "02:00"`
    pub fn from_legacy(dow: &str, starttime: &str) -> Result<Self> {
        Self::new(parse_days(dow)?, parse_time(starttime)?)
    }

    /// 相对 `now` 最近一次应当执行备份的日期
    pub fn target_date(&self, now: NaiveDateTime) -> NaiveDate {
        resolve_target_date(self, now)
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.days, self.start.format("%H:%M"))
    }
}

/// 解析星期表达式
///
/// 支持 `*`、单个星期、逗号列表以及 `start..end` 区间（区间可跨周，如 `fri..mon`）。
pub fn parse_days(expr: &str) -> Result<WeekdaySet> {
    let expr = expr.trim();
    if expr == "*" {
        return Ok(WeekdaySet::ALL);
    }

    let mut days = WeekdaySet::empty();
    for item in expr.split(',') {
        if let Some((start, end)) = item.split_once("..") {
            let start = weekday_from_token(start)
                .ok_or_else(|| ProbeError::schedule(format!("无效的星期: '{start}' ({expr})")))?;
            let end = weekday_from_token(end)
                .ok_or_else(|| ProbeError::schedule(format!("无效的星期: '{end}' ({expr})")))?;

            let mut day = start;
            loop {
                days.insert(day);
                if day == end {
                    break;
                }
                day = day.succ();
            }
        } else {
            let day = weekday_from_token(item)
                .ok_or_else(|| ProbeError::schedule(format!("无效的星期: '{item}' ({expr})")))?;
            days.insert(day);
        }
    }

    if days.is_empty() {
        return Err(ProbeError::schedule(format!("星期表达式为空: '{expr}'")));
    }
    Ok(days)
}

/// 解析开始时间，只接受单个 `H:MM` 时间点
pub fn parse_time(expr: &str) -> Result<NaiveTime> {
    let expr = expr.trim();
    if expr.contains("..") {
        return Err(ProbeError::schedule(format!("不支持时间区间: '{expr}'")));
    }
    if expr.contains(',') {
        return Err(ProbeError::schedule(format!("不支持时间列表: '{expr}'")));
    }

    let (hour, minute) = expr
        .split_once(':')
        .ok_or_else(|| ProbeError::schedule(format!("无效的时间: '{expr}'")))?;
    let hour = parse_time_field(hour, expr)?;
    let minute = parse_time_field(minute, expr)?;

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ProbeError::schedule(format!("时间超出范围: '{expr}'")))
}

fn parse_time_field(field: &str, expr: &str) -> Result<u32> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProbeError::schedule(format!("无效的时间: '{expr}'")));
    }
    field
        .parse()
        .map_err(|_| ProbeError::schedule(format!("无效的时间: '{expr}'")))
}

fn looks_like_days(expr: &str) -> bool {
    let lower = expr.to_ascii_lowercase();
    lower == "*"
        || ALL_WEEKDAYS
            .iter()
            .any(|day| lower.contains(weekday_token(*day)))
}

/// 解析日历事件字符串
///
/// 只有时间没有星期时表示每天；只有星期没有时间时从 00:00 开始。
pub fn parse_calendar_event(expr: &str) -> Result<Timing> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    match parts.as_slice() {
        [days, time] => Timing::new(parse_days(days)?, parse_time(time)?),
        [single] if looks_like_days(single) => Timing::new(parse_days(single)?, NaiveTime::MIN),
        [single] => Timing::new(WeekdaySet::ALL, parse_time(single)?),
        [] => Err(ProbeError::schedule("日历事件为空")),
        _ => Err(ProbeError::schedule(format!("不支持的日历事件: '{expr}'"))),
    }
}

/// 计算最近一次应当执行备份的日期
///
/// 今天的开始时间还没到时从昨天算起，然后逐日回退直到落在计划的星期上，最多回退 7 天。
pub fn resolve_target_date(timing: &Timing, now: NaiveDateTime) -> NaiveDate {
    let today = now.date();
    let mut candidate = if now.time() < timing.start {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    };

    for _ in 0..=MAX_WEEKDAY_STEPS {
        if timing.days.contains(candidate.weekday()) {
            return candidate;
        }
        match candidate.pred_opt() {
            Some(previous) => candidate = previous,
            None => break,
        }
    }
    candidate
}
