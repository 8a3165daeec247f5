//! Attendance reporting service for a campus attendance system.
//!
//! The core is the bucketed report engine in [`report`]: it validates the
//! request, plans calendar buckets with [`buckets`], asks an
//! [`store::AttendanceStore`] for per-bucket counts and lays them out as a
//! fixed-length, chronologically ordered sequence. [`attendance`] holds the
//! simpler summary and listing reads that share the same lecturer scoping.

pub mod attendance;
pub mod buckets;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod params;
pub mod report;
pub mod store;

pub use buckets::{Bucket, Period, ReportMode};
pub use error::{AppError, StoreError};
pub use http::{build_router, AppState};
pub use models::{AttendanceStatus, BucketCount, BucketRow};
pub use report::{generate_report, ReportRequest};
pub use store::{AttendanceStore, Scope};
