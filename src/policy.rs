//! Retention policy parsing.

use crate::error::PolicyError;
use crate::unit::TimeUnit;
use serde::Deserialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// How successive units relate along the timeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Every unit starts from the newest bucket; protected windows overlap
    #[default]
    Progressive,
    /// Each unit starts where the previous one stopped; windows tile the timeline
    Cumulative,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Progressive => f.write_str("progressive"),
            SelectionMode::Cumulative => f.write_str("cumulative"),
        }
    }
}

/// Retain counts per time unit. Units without a count are not evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generations {
    counts: [Option<NonZeroUsize>; TimeUnit::COUNT],
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count for a unit, replacing any earlier one
    pub fn set(&mut self, unit: TimeUnit, count: NonZeroUsize) {
        self.counts[unit.index()] = Some(count);
    }

    pub fn get(&self, unit: TimeUnit) -> Option<NonZeroUsize> {
        self.counts[unit.index()]
    }

    /// Configured units with their counts, finest first
    pub fn iter(&self) -> impl Iterator<Item = (TimeUnit, NonZeroUsize)> + '_ {
        TimeUnit::ALL
            .into_iter()
            .filter_map(|unit| self.get(unit).map(|count| (unit, count)))
    }
}

/// What to keep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep everything, skipping resolution entirely
    RetainAll,
    /// Keep a number of buckets per time unit
    Generations(Generations),
}

impl FromStr for RetentionPolicy {
    type Err = PolicyError;

    /// Parse whitespace or comma separated `unit[=count]` tokens.
    ///
    /// Examples: "all", "last=3 days=7 weeks", "keep-daily=7, keep-yearly=10"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut generations = Generations::new();
        let mut retain_all = false;
        let mut seen_token = false;

        for token in s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            seen_token = true;
            let lowered = token.to_ascii_lowercase();
            let body = lowered.strip_prefix("keep-").unwrap_or(lowered.as_str());
            let (name, count) = match body.split_once('=') {
                Some((name, count)) => (name, Some(count)),
                None => (body, None),
            };

            if name == "all" {
                if count.is_some() {
                    return Err(PolicyError::CountOnAll(token.to_string()));
                }
                retain_all = true;
                continue;
            }

            let unit = TimeUnit::from_name(name)
                .ok_or_else(|| PolicyError::UnknownUnit(token.to_string()))?;
            let count = match count {
                None => NonZeroUsize::MIN,
                Some(raw) => raw
                    .trim()
                    .parse::<NonZeroUsize>()
                    .map_err(|_| PolicyError::InvalidCount(token.to_string()))?,
            };
            generations.set(unit, count);
        }

        if !seen_token {
            return Err(PolicyError::Empty);
        }
        if retain_all {
            return Ok(RetentionPolicy::RetainAll);
        }
        Ok(RetentionPolicy::Generations(generations))
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionPolicy::RetainAll => f.write_str("all"),
            RetentionPolicy::Generations(generations) => {
                let tokens: Vec<String> = generations
                    .iter()
                    .map(|(unit, count)| format!("{}={}", unit.policy_name(), count))
                    .collect();
                f.write_str(&tokens.join(" "))
            }
        }
    }
}
