//! Backup Retention - Generational Backup Pruning
//!
//! Decides, for a directory of backups whose names encode a date and time,
//! which to keep and which can go, under a policy such as
//! `last=3 days=7 weeks=6 years=10`.
//!
//! ## Pipeline
//!
//! 1. [`scanner`] lists entries matching a [`template::FormatTemplate`] and
//!    classifies each name as timestamped, future-dated or invalid
//! 2. [`bucket`] groups timestamped backups per [`unit::TimeUnit`]
//! 3. [`resolver`] walks the buckets of every configured unit and records
//!    reasons to keep
//! 4. [`disposition`] reports, moves or deletes the backups left without a reason

pub mod bucket;
pub mod config;
pub mod disposition;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod scanner;
pub mod template;
pub mod time;
pub mod unit;

// Re-export commonly used items
pub use bucket::{Bucket, BucketHierarchy, Hierarchies};
pub use config::{FileConfig, Overrides, RunConfig};
pub use disposition::{
    check_destination, delete_disposable, move_disposable, prepare_destination, write_report,
    Action, DispositionOptions, DispositionSummary,
};
pub use error::{ConfigError, DispositionError, PolicyError, ScanError, TemplateError};
pub use policy::{Generations, RetentionPolicy, SelectionMode};
pub use resolver::{resolve, Reason, RetentionReasons};
pub use scanner::{scan_directory, Artifact};
pub use template::FormatTemplate;
pub use time::Classification;
pub use unit::{BucketKey, TimeUnit};
