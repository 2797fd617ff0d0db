use crate::types::station_class::Resolution;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A calendar month, the bucket the near-real-time tables are published in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Returns `None` when `month` is not in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// The `YYYYMM` period token used by the data query.
    pub fn token(self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(self) -> NaiveDate {
        self.succ()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn days(self) -> u32 {
        self.last_day().day()
    }

    /// Every day of the month, in order.
    pub fn dates(self) -> impl Iterator<Item = NaiveDate> {
        self.first_day().iter_days().take(self.days() as usize)
    }

    /// Every calendar instant of the month at the given resolution, in order.
    /// Daily instants sit at midnight.
    pub fn instants(self, resolution: Resolution) -> Vec<NaiveDateTime> {
        let per_day = resolution.units_per_day();
        self.dates()
            .flat_map(|date| {
                (0..per_day).map(move |hour| {
                    date.and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(hour))
                })
            })
            .collect()
    }

    /// First-of-month dates falling within `start..=end`, as months.
    ///
    /// A range that starts after the 1st does not include its starting month;
    /// `2019-01-10..=2019-02-02` yields only February.
    pub fn starting_between(start: NaiveDate, end: NaiveDate) -> Vec<Month> {
        let mut month = Month::of(start);
        if month.first_day() < start {
            month = month.succ();
        }
        let mut months = Vec::new();
        while month.first_day() <= end {
            months.push(month);
            month = month.succ();
        }
        months
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
