//! Retention resolution.
//!
//! For each configured unit, finest first, a walk over that unit's buckets
//! credits the newest artifact of up to `N` buckets. In progressive mode every
//! walk starts at the newest bucket. In cumulative mode a [`Timeline`] cursor
//! carries the last credited artifact from one unit to the next, so each unit
//! picks up right after the period the previous one ended in.

use crate::bucket::Hierarchies;
use crate::policy::{Generations, RetentionPolicy, SelectionMode};
use crate::scanner::Artifact;
use crate::time::Classification;
use crate::unit::{BucketKey, TimeUnit};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Why an artifact is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    RetainAll,
    InvalidTimestamp,
    FutureTimestamp,
    /// Credited as the newest artifact of the `rank`-th bucket of `unit`
    Generation {
        unit: TimeUnit,
        rank: usize,
        count: usize,
        key: BucketKey,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::RetainAll => f.write_str("retain all"),
            Reason::InvalidTimestamp => f.write_str("invalid timestamp"),
            Reason::FutureTimestamp => f.write_str("timestamp is in the future"),
            Reason::Generation {
                unit,
                rank,
                count,
                key,
            } => write!(f, "{} {}/{} ({})", unit.label(), rank, count, key),
        }
    }
}

/// Reasons to keep, per scanned artifact. An empty list means disposable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReasons {
    entries: BTreeMap<PathBuf, Vec<Reason>>,
}

impl RetentionReasons {
    fn with_artifacts(artifacts: &[Artifact]) -> Self {
        let entries = artifacts
            .iter()
            .map(|artifact| (artifact.path.clone(), Vec::new()))
            .collect();
        RetentionReasons { entries }
    }

    fn push(&mut self, path: &Path, reason: Reason) {
        if let Some(reasons) = self.entries.get_mut(path) {
            reasons.push(reason);
        }
    }

    pub fn get(&self, path: &Path) -> Option<&[Reason]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, sorted by path
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[Reason])> {
        self.entries
            .iter()
            .map(|(path, reasons)| (path.as_path(), reasons.as_slice()))
    }

    pub fn kept(&self) -> impl Iterator<Item = &Path> {
        self.iter()
            .filter(|(_, reasons)| !reasons.is_empty())
            .map(|(path, _)| path)
    }

    pub fn disposable(&self) -> impl Iterator<Item = &Path> {
        self.iter()
            .filter(|(_, reasons)| reasons.is_empty())
            .map(|(path, _)| path)
    }
}

/// Where the next unit's walk may start, in cumulative mode
#[derive(Debug, Clone, Copy)]
enum Timeline<'a> {
    /// Nothing credited yet; start at the newest bucket
    Open,
    /// Start after the bucket that holds this artifact
    After(&'a Artifact),
    /// A unit found no bucket left; coarser units have nothing to cover
    Closed,
}

/// Decide which artifacts to keep
pub fn resolve(
    artifacts: &[Artifact],
    policy: &RetentionPolicy,
    mode: SelectionMode,
) -> RetentionReasons {
    let mut reasons = RetentionReasons::with_artifacts(artifacts);

    let generations = match policy {
        RetentionPolicy::RetainAll => {
            for artifact in artifacts {
                reasons.push(&artifact.path, Reason::RetainAll);
            }
            return reasons;
        }
        RetentionPolicy::Generations(generations) => generations,
    };

    for artifact in artifacts {
        match artifact.classification {
            Classification::Invalid => reasons.push(&artifact.path, Reason::InvalidTimestamp),
            Classification::Future(_) => reasons.push(&artifact.path, Reason::FutureTimestamp),
            Classification::Timestamped(_) => {}
        }
    }

    let hierarchies = Hierarchies::build(artifacts);
    credit_generations(&hierarchies, generations, mode, &mut reasons);
    reasons
}

fn credit_generations<'a>(
    hierarchies: &Hierarchies<'a>,
    generations: &Generations,
    mode: SelectionMode,
    reasons: &mut RetentionReasons,
) {
    let mut timeline = Timeline::Open;

    for unit in TimeUnit::ALL {
        let Some(count) = generations.get(unit) else {
            continue;
        };
        let hierarchy = hierarchies.get(unit);

        let start = match (mode, timeline) {
            (SelectionMode::Progressive, _) | (SelectionMode::Cumulative, Timeline::Open) => 0,
            (SelectionMode::Cumulative, Timeline::After(boundary)) => hierarchy
                .position_of(boundary)
                .map_or(hierarchy.len(), |index| index + 1),
            (SelectionMode::Cumulative, Timeline::Closed) => {
                debug!(%unit, "timeline exhausted, skipping remaining units");
                break;
            }
        };

        let mut last_credited = None;
        for (index, bucket) in hierarchy
            .buckets()
            .iter()
            .skip(start)
            .take(count.get())
            .enumerate()
        {
            let newest = bucket.newest();
            reasons.push(
                &newest.path,
                Reason::Generation {
                    unit,
                    rank: index + 1,
                    count: count.get(),
                    key: bucket.key().clone(),
                },
            );
            last_credited = Some(newest);
        }

        debug!(
            %unit,
            start,
            credited = last_credited.is_some(),
            "evaluated retention unit"
        );
        timeline = match last_credited {
            Some(artifact) => Timeline::After(artifact),
            None => Timeline::Closed,
        };
    }
}
