//! Time units and the calendar keys that group artifacts into buckets.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Granularity of a retention rule, ordered finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeUnit {
    /// Every artifact is its own bucket
    Latest,
    Hour,
    Day,
    /// ISO 8601 week
    Week,
    /// Pair of ISO weeks: weeks 1-2, 3-4, ...
    Fortnight,
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl TimeUnit {
    /// Number of units
    pub const COUNT: usize = 9;

    /// Every unit, finest first. Rules are evaluated in exactly this order.
    pub const ALL: [TimeUnit; TimeUnit::COUNT] = [
        TimeUnit::Latest,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Fortnight,
        TimeUnit::Month,
        TimeUnit::Quarter,
        TimeUnit::HalfYear,
        TimeUnit::Year,
    ];

    /// Position of this unit in [`TimeUnit::ALL`]
    pub fn index(self) -> usize {
        match self {
            TimeUnit::Latest => 0,
            TimeUnit::Hour => 1,
            TimeUnit::Day => 2,
            TimeUnit::Week => 3,
            TimeUnit::Fortnight => 4,
            TimeUnit::Month => 5,
            TimeUnit::Quarter => 6,
            TimeUnit::HalfYear => 7,
            TimeUnit::Year => 8,
        }
    }

    /// Label used in retention reasons, e.g. "day 2/7 (2024-03-02)"
    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Latest => "last",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Fortnight => "fortnight",
            TimeUnit::Month => "month",
            TimeUnit::Quarter => "quarter",
            TimeUnit::HalfYear => "half-year",
            TimeUnit::Year => "year",
        }
    }

    /// Canonical name in a policy string, e.g. "days"
    pub fn policy_name(self) -> &'static str {
        match self {
            TimeUnit::Latest => "last",
            TimeUnit::Hour => "hours",
            TimeUnit::Day => "days",
            TimeUnit::Week => "weeks",
            TimeUnit::Fortnight => "fortnights",
            TimeUnit::Month => "months",
            TimeUnit::Quarter => "quarters",
            TimeUnit::HalfYear => "halfyears",
            TimeUnit::Year => "years",
        }
    }

    /// Parse a policy unit name. Accepts plural, singular and adverb spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let unit = match name.to_ascii_lowercase().as_str() {
            "last" | "latest" => TimeUnit::Latest,
            "hours" | "hour" | "hourly" => TimeUnit::Hour,
            "days" | "day" | "daily" => TimeUnit::Day,
            "weeks" | "week" | "weekly" => TimeUnit::Week,
            "fortnights" | "fortnight" | "fortnightly" => TimeUnit::Fortnight,
            "months" | "month" | "monthly" => TimeUnit::Month,
            "quarters" | "quarter" | "quarterly" => TimeUnit::Quarter,
            "halfyears" | "halfyear" | "half-years" | "half-year" | "halfyearly" => {
                TimeUnit::HalfYear
            }
            "years" | "year" | "yearly" => TimeUnit::Year,
            _ => return None,
        };
        Some(unit)
    }

    /// Bucket key of an artifact for this unit.
    ///
    /// Only [`TimeUnit::Latest`] looks at the name; every other unit derives
    /// its key from the timestamp alone.
    pub fn key_for(self, name: &str, timestamp: NaiveDateTime) -> BucketKey {
        match self {
            TimeUnit::Latest => BucketKey::Item(name.to_string()),
            TimeUnit::Hour => BucketKey::Hour {
                date: timestamp.date(),
                hour: timestamp.hour(),
            },
            TimeUnit::Day => BucketKey::Day(timestamp.date()),
            TimeUnit::Week => {
                let week = timestamp.iso_week();
                BucketKey::Week {
                    year: week.year(),
                    week: week.week(),
                }
            }
            TimeUnit::Fortnight => {
                let week = timestamp.iso_week();
                BucketKey::Fortnight {
                    year: week.year(),
                    fortnight: week.week().div_ceil(2),
                }
            }
            TimeUnit::Month => BucketKey::Month {
                year: timestamp.year(),
                month: timestamp.month(),
            },
            TimeUnit::Quarter => BucketKey::Quarter {
                year: timestamp.year(),
                quarter: timestamp.month().div_ceil(3),
            },
            TimeUnit::HalfYear => BucketKey::HalfYear {
                year: timestamp.year(),
                half: timestamp.month().div_ceil(6),
            },
            TimeUnit::Year => BucketKey::Year(timestamp.year()),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.policy_name())
    }
}

/// Calendar period shared by the members of one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    Item(String),
    Hour { date: NaiveDate, hour: u32 },
    Day(NaiveDate),
    /// ISO week-numbering year, which differs from the calendar year around New Year
    Week { year: i32, week: u32 },
    Fortnight { year: i32, fortnight: u32 },
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    HalfYear { year: i32, half: u32 },
    Year(i32),
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Item(name) => f.write_str(name),
            BucketKey::Hour { date, hour } => write!(f, "{}T{:02}", date.format("%Y-%m-%d"), hour),
            BucketKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            BucketKey::Week { year, week } => write!(f, "{year:04}-W{week:02}"),
            BucketKey::Fortnight { year, fortnight } => write!(f, "{year:04}-F{fortnight:02}"),
            BucketKey::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            BucketKey::Quarter { year, quarter } => write!(f, "{year:04}-Q{quarter}"),
            BucketKey::HalfYear { year, half } => write!(f, "{year:04}-H{half}"),
            BucketKey::Year(year) => write!(f, "{year:04}"),
        }
    }
}
