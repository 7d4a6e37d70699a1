use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

/// Years a search for the next fire instant will scan before giving up, per
/// the runtime. A schedule that legitimately can't fire again within that
/// horizon (e.g. `0 0 0 30 2 *`, a day of month no month has) is treated the
/// same as a malformed one.
const MAX_SEARCH_YEARS: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronError {
    /// Fewer or more than the six required fields (seconds minutes hours
    /// day-of-month month day-of-week).
    WrongFieldCount(usize),
    InvalidField { field: &'static str, value: String },
    /// Both day-of-month and day-of-week were given as literal `?`, which
    /// leaves no day constrained at all — the runtime requires at least one of
    /// the two to carry a real restriction (`*` counts as one).
    BothDayFieldsWildcarded,
    /// No instant in the next [`MAX_SEARCH_YEARS`] years satisfies the
    /// schedule.
    NoFutureMatch,
}

impl fmt::Display for CronError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CronError::WrongFieldCount(n) => write!(f, "cron expression must have 6 fields, got {n}"),
            CronError::InvalidField { field, value } => write!(f, "invalid {field} field: {value:?}"),
            CronError::BothDayFieldsWildcarded => {
                write!(f, "day-of-month and day-of-week cannot both be `?`")
            }
            CronError::NoFutureMatch => {
                write!(f, "no matching instant within {MAX_SEARCH_YEARS} years")
            }
        }
    }
}

impl std::error::Error for CronError {}

/// A day-of-month or day-of-week field. `?` ("don't care", the runtime) is kept
/// distinct from `Mask` at the type level because the validation rule —
/// "both fields `?` is invalid, both fields `*` is fine" — depends on which
/// of the two was actually written, even though `?` and an all-ones `*` mask
/// are semantically identical at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DayField {
    Any,
    Mask(u64),
}

impl DayField {
    fn matches(&self, value: u32) -> bool {
        match self {
            DayField::Any => true,
            DayField::Mask(bits) => bits & (1 << value) != 0,
        }
    }
}

/// A parsed six-field cron expression, evaluated against local civil time in
/// whatever zone the caller resolves instants through (the runtime/§4.7). Day of
/// month and day of week are ANDed together when both carry a real
/// restriction — DESIGN.md records this as the Open Question decision for
/// "both day fields restricted" (most cron implementations OR them; this one
/// ANDs, matching the original scheduler's semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    seconds: u64,
    minutes: u64,
    hours: u32,
    months: u16,
    day_of_month: DayField,
    day_of_week: DayField,
    source: String,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(CronError::WrongFieldCount(fields.len()));
        }

        let seconds = parse_numeric_field(fields[0], 0, 59, "seconds")?;
        let minutes = parse_numeric_field(fields[1], 0, 59, "minutes")?;
        let hours = parse_numeric_field(fields[2], 0, 23, "hours")? as u32;
        let day_of_month = parse_day_field(fields[3], 1, 31, "day-of-month")?;
        let months = parse_numeric_field(fields[4], 1, 12, "month")? as u16;
        let day_of_week = parse_day_field(fields[5], 0, 7, "day-of-week")?;

        if day_of_month == DayField::Any && day_of_week == DayField::Any {
            return Err(CronError::BothDayFieldsWildcarded);
        }

        Ok(Self {
            seconds,
            minutes,
            hours,
            months,
            day_of_month,
            day_of_week,
            source: expr.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn day_of_month_matches(&self, date: NaiveDate) -> bool {
        self.day_of_month.matches(date.day())
    }

    fn day_of_week_matches(&self, date: NaiveDate) -> bool {
        // chrono's Weekday::num_days_from_sunday gives 0=Sunday..6=Saturday;
        // field 7 is accepted as an alias for Sunday per common cron usage.
        let dow = date.weekday().num_days_from_sunday();
        self.day_of_week.matches(dow) || (dow == 0 && self.day_of_week.matches(7))
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        match (&self.day_of_month, &self.day_of_week) {
            (DayField::Any, _) => self.day_of_week_matches(date),
            (_, DayField::Any) => self.day_of_month_matches(date),
            _ => self.day_of_month_matches(date) && self.day_of_week_matches(date),
        }
    }

    /// First local civil instant strictly after `after` that satisfies this
    /// schedule, resolved back through `tz`. Walks field-by-field (month,
    /// then day, then hour, then minute, then second) jumping straight to
    /// the next candidate boundary rather than scanning second by second, so
    /// a schedule that only fires once a year still resolves in constant
    /// time. DST gaps are skipped forward past (a local time that never
    /// occurred can't be a fire instant); DST folds resolve to the earlier
    /// of the two occurrences.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>, tz: &Tz) -> Result<DateTime<Tz>, CronError> {
        let start = after.naive_local();
        let mut candidate = start + chrono::Duration::seconds(1);
        let deadline_year = start.year() + MAX_SEARCH_YEARS;

        loop {
            if candidate.year() > deadline_year {
                return Err(CronError::NoFutureMatch);
            }

            if self.months & (1 << candidate.month()) == 0 {
                candidate = first_of_next_month(candidate);
                continue;
            }
            if !self.day_matches(candidate.date()) {
                candidate = first_of_next_day(candidate);
                continue;
            }
            if self.hours & (1 << candidate.hour()) == 0 {
                candidate = first_of_next_hour(candidate);
                continue;
            }
            if self.minutes & (1 << candidate.minute()) == 0 {
                candidate = first_of_next_minute(candidate);
                continue;
            }
            if self.seconds & (1 << candidate.second()) == 0 {
                candidate = candidate + chrono::Duration::seconds(1);
                continue;
            }

            match tz.from_local_datetime(&candidate) {
                chrono::LocalResult::Single(dt) => return Ok(dt),
                chrono::LocalResult::Ambiguous(earlier, _later) => return Ok(earlier),
                chrono::LocalResult::None => {
                    candidate = candidate + chrono::Duration::hours(1);
                    continue;
                }
            }
        }
    }
}

fn first_of_next_month(dt: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = if dt.month() == 12 { (dt.year() + 1, 1) } else { (dt.year(), dt.month() + 1) };
    NaiveDate::from_ymd_opt(year, month, 1)
        .expect("computed (year, month) is always valid")
        .and_time(NaiveTime::MIN)
}

fn first_of_next_day(dt: NaiveDateTime) -> NaiveDateTime {
    match dt.date().succ_opt() {
        Some(next) => next.and_time(NaiveTime::MIN),
        None => first_of_next_month(dt),
    }
}

fn first_of_next_hour(dt: NaiveDateTime) -> NaiveDateTime {
    let date = dt.date();
    let hour = dt.hour();
    if hour == 23 {
        first_of_next_day(dt)
    } else {
        date.and_hms_opt(hour + 1, 0, 0).expect("hour + 1 <= 23")
    }
}

fn first_of_next_minute(dt: NaiveDateTime) -> NaiveDateTime {
    let date = dt.date();
    let (hour, minute) = (dt.hour(), dt.minute());
    if minute == 59 {
        first_of_next_hour(dt)
    } else {
        date.and_hms_opt(hour, minute + 1, 0).expect("minute + 1 <= 59")
    }
}

fn parse_numeric_field(raw: &str, min: u32, max: u32, name: &'static str) -> Result<u64, CronError> {
    if raw == "*" {
        return Ok(full_mask(min, max));
    }

    let mut mask = 0u64;
    for part in raw.split(',') {
        mask |= parse_range_or_step(part, min, max, name)?;
    }
    if mask == 0 {
        return Err(CronError::InvalidField { field: name, value: raw.to_string() });
    }
    Ok(mask)
}

fn parse_day_field(raw: &str, min: u32, max: u32, name: &'static str) -> Result<DayField, CronError> {
    if raw == "?" {
        return Ok(DayField::Any);
    }
    parse_numeric_field(raw, min, max, name).map(DayField::Mask)
}

fn parse_range_or_step(part: &str, min: u32, max: u32, name: &'static str) -> Result<u64, CronError> {
    let invalid = || CronError::InvalidField { field: name, value: part.to_string() };

    let (range_part, step) = match part.split_once('/') {
        Some((range, step)) => (range, step.parse::<u32>().map_err(|_| invalid())?),
        None => (part, 1),
    };
    if step == 0 {
        return Err(invalid());
    }

    let (lo, hi) = if range_part == "*" {
        (min, max)
    } else if let Some((lo, hi)) = range_part.split_once('-') {
        let lo: u32 = lo.parse().map_err(|_| invalid())?;
        let hi: u32 = hi.parse().map_err(|_| invalid())?;
        (lo, hi)
    } else {
        let value: u32 = range_part.parse().map_err(|_| invalid())?;
        (value, value)
    };

    if lo < min || hi > max || lo > hi {
        return Err(invalid());
    }

    let mut mask = 0u64;
    let mut value = lo;
    while value <= hi {
        mask |= 1 << value;
        value += step;
    }
    Ok(mask)
}

fn full_mask(min: u32, max: u32) -> u64 {
    let mut mask = 0u64;
    let mut value = min;
    while value <= max {
        mask |= 1 << value;
        value += 1;
    }
    mask
}
