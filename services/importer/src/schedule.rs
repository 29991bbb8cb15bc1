//! Periodic run times.
//!
//! Interval units (`seconds` .. `weeks`) count from the end of the previous
//! run. With `at`, day and week schedules fire at that wall-clock time in the
//! configured timezone; weekday schedules always do, at midnight by default.

use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, LocalResult, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use ingestion::{PeriodUnit, PeriodicConfig, Until};

#[derive(Debug, Clone)]
pub struct Schedule {
    every: u32,
    unit: PeriodUnit,
    at: Option<NaiveTime>,
    timezone: Tz,
    deadline: Option<DateTime<Utc>>,
    sleep: Duration,
}

impl Schedule {
    /// Resolve `config` against the current time. A deadline that already
    /// passed is an error.
    pub fn new(config: &PeriodicConfig, now: DateTime<Utc>) -> Result<Self> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|e| anyhow!("PERIODIC_TIMEZONE '{}': {}", config.timezone, e))?;

        let deadline = match config.until {
            None => None,
            Some(Until::DateTime(local)) => Some(resolve_local(timezone, local)?),
            Some(Until::TimeOfDay(time)) => {
                let today = now.with_timezone(&timezone).date_naive();
                Some(resolve_local(timezone, today.and_time(time))?)
            }
        };
        if let Some(deadline) = deadline {
            if deadline <= now {
                bail!("PERIODIC_UNTIL {} is in the past", deadline);
            }
        }

        Ok(Self {
            every: config.every,
            unit: config.unit,
            at: config.at,
            timezone,
            deadline,
            sleep: config.sleep,
        })
    }

    /// Minimum pause between schedule checks.
    pub fn sleep(&self) -> Duration {
        self.sleep
    }

    /// First run time strictly after `after`, or `None` once the deadline
    /// would be exceeded.
    pub fn next_run(&self, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let every = i64::from(self.every);
        let next = match (self.unit, self.at) {
            (PeriodUnit::Seconds, _) => after + ChronoDuration::seconds(every),
            (PeriodUnit::Minutes, _) => after + ChronoDuration::minutes(every),
            (PeriodUnit::Hours, _) => after + ChronoDuration::hours(every),
            (PeriodUnit::Days, None) => after + ChronoDuration::days(every),
            (PeriodUnit::Weeks, None) => after + ChronoDuration::weeks(every),
            (PeriodUnit::Days, Some(at)) => self.next_at(after, at, ChronoDuration::days(every))?,
            (PeriodUnit::Weeks, Some(at)) => {
                self.next_at(after, at, ChronoDuration::weeks(every))?
            }
            (PeriodUnit::Weekday(weekday), at) => {
                let local = after.with_timezone(&self.timezone).date_naive();
                let ahead = (7 + weekday.num_days_from_monday()
                    - local.weekday().num_days_from_monday())
                    % 7;
                let day = local + ChronoDuration::days(i64::from(ahead));
                let time = at.unwrap_or(NaiveTime::MIN);
                let candidate = resolve_local(self.timezone, day.and_time(time))?;
                if candidate > after {
                    candidate
                } else {
                    resolve_local(
                        self.timezone,
                        (day + ChronoDuration::weeks(1)).and_time(time),
                    )?
                }
            }
        };

        Ok(match self.deadline {
            Some(deadline) if next > deadline => None,
            _ => Some(next),
        })
    }

    /// Today's `at` if still ahead, otherwise one period later.
    fn next_at(
        &self,
        after: DateTime<Utc>,
        at: NaiveTime,
        period: ChronoDuration,
    ) -> Result<DateTime<Utc>> {
        let today = after.with_timezone(&self.timezone).date_naive();
        let candidate = resolve_local(self.timezone, today.and_time(at))?;
        if candidate > after {
            Ok(candidate)
        } else {
            resolve_local(self.timezone, (today + period).and_time(at))
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            PeriodUnit::Seconds => write!(f, "every {} seconds", self.every)?,
            PeriodUnit::Minutes => write!(f, "every {} minutes", self.every)?,
            PeriodUnit::Hours => write!(f, "every {} hours", self.every)?,
            PeriodUnit::Days => write!(f, "every {} days", self.every)?,
            PeriodUnit::Weeks => write!(f, "every {} weeks", self.every)?,
            PeriodUnit::Weekday(day) => write!(f, "every {:?}", day)?,
        }
        if let Some(at) = self.at {
            write!(f, " at {} {}", at, self.timezone)?;
        }
        if let Some(deadline) = self.deadline {
            write!(f, " until {}", deadline)?;
        }
        Ok(())
    }
}

/// Local wall-clock time to UTC. Ambiguous times take the earlier instant;
/// times skipped by a DST change move forward by an hour.
fn resolve_local(timezone: Tz, local: NaiveDateTime) -> Result<DateTime<Utc>> {
    let resolved = match timezone.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt),
        LocalResult::None => timezone
            .from_local_datetime(&(local + ChronoDuration::hours(1)))
            .earliest(),
    };
    resolved
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("{} does not exist in {}", local, timezone))
}
