//! Temporal bucketing.
//!
//! Timestamped artifacts are sorted newest-first (timestamp descending, then
//! name ascending) and grouped once per [`TimeUnit`]. Calendar keys are
//! monotone in time, so every bucket is a contiguous run of that ordering and
//! buckets come out newest-first without a separate sort.

use crate::scanner::Artifact;
use crate::unit::{BucketKey, TimeUnit};
use chrono::NaiveDateTime;
use std::cmp::Ordering;

/// Artifacts sharing one calendar period, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket<'a> {
    key: BucketKey,
    members: Vec<&'a Artifact>,
}

impl<'a> Bucket<'a> {
    pub fn key(&self) -> &BucketKey {
        &self.key
    }

    pub fn members(&self) -> &[&'a Artifact] {
        &self.members
    }

    /// The artifact credited when this bucket is retained.
    /// Buckets are created with their first member, so this never fails.
    pub fn newest(&self) -> &'a Artifact {
        self.members[0]
    }
}

/// All buckets of one unit, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketHierarchy<'a> {
    unit: TimeUnit,
    buckets: Vec<Bucket<'a>>,
}

impl<'a> BucketHierarchy<'a> {
    fn new(unit: TimeUnit) -> Self {
        BucketHierarchy {
            unit,
            buckets: Vec::new(),
        }
    }

    /// Append an artifact older than (or tied with) everything already pushed
    fn push(&mut self, artifact: &'a Artifact, timestamp: NaiveDateTime) {
        let key = self.unit.key_for(&artifact.name, timestamp);
        if self.unit != TimeUnit::Latest {
            if let Some(last) = self.buckets.last_mut() {
                if last.key == key {
                    last.members.push(artifact);
                    return;
                }
            }
        }
        self.buckets.push(Bucket {
            key,
            members: vec![artifact],
        });
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn buckets(&self) -> &[Bucket<'a>] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Index of the bucket holding `artifact`, if it was bucketed
    pub fn position_of(&self, artifact: &Artifact) -> Option<usize> {
        let timestamp = artifact.timestamp()?;
        let key = self.unit.key_for(&artifact.name, timestamp);
        self.buckets.iter().position(|bucket| bucket.key == key)
    }
}

/// One hierarchy per time unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchies<'a> {
    by_unit: [BucketHierarchy<'a>; TimeUnit::COUNT],
}

impl<'a> Hierarchies<'a> {
    /// Bucket every timestamped artifact; Invalid and Future ones are left out
    pub fn build(artifacts: &'a [Artifact]) -> Self {
        let mut timestamped: Vec<(&'a Artifact, NaiveDateTime)> = artifacts
            .iter()
            .filter_map(|artifact| artifact.timestamp().map(|ts| (artifact, ts)))
            .collect();
        timestamped.sort_by(|(a, a_ts), (b, b_ts)| newest_first(a, *a_ts, b, *b_ts));

        let mut by_unit = TimeUnit::ALL.map(BucketHierarchy::new);
        for (artifact, timestamp) in timestamped {
            for hierarchy in by_unit.iter_mut() {
                hierarchy.push(artifact, timestamp);
            }
        }

        Hierarchies { by_unit }
    }

    pub fn get(&self, unit: TimeUnit) -> &BucketHierarchy<'a> {
        &self.by_unit[unit.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BucketHierarchy<'a>> {
        self.by_unit.iter()
    }
}

fn newest_first(a: &Artifact, a_ts: NaiveDateTime, b: &Artifact, b_ts: NaiveDateTime) -> Ordering {
    b_ts.cmp(&a_ts)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.path.cmp(&b.path))
}
