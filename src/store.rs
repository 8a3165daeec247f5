use async_trait::async_trait;
use uuid::Uuid;

use crate::buckets::Bucket;
use crate::error::StoreError;
use crate::models::{
    AttendanceDetail, AttendanceSummary, BucketRow, ClassOverview, StudentAttendanceRecord,
    StudentAttendanceSummary,
};

/// Ownership chain every attendance query is restricted to:
/// attendance -> schedule -> class -> lecturer, optionally one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub lecturer_id: Uuid,
    pub class_id: Option<Uuid>,
}

impl Scope {
    pub fn new(lecturer_id: Uuid, class_id: Option<Uuid>) -> Self {
        Self {
            lecturer_id,
            class_id,
        }
    }

    pub fn lecturer(lecturer_id: Uuid) -> Self {
        Self::new(lecturer_id, None)
    }
}

/// Read-only access to the relational store backing the reports.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Counts per bucket, left-joined so every bucket yields a row.
    async fn bucket_counts(
        &self,
        scope: &Scope,
        buckets: &[Bucket],
    ) -> Result<Vec<BucketRow>, StoreError>;

    async fn summary(&self, scope: &Scope) -> Result<AttendanceSummary, StoreError>;

    async fn details(
        &self,
        scope: &Scope,
        schedule_id: Option<Uuid>,
    ) -> Result<Vec<AttendanceDetail>, StoreError>;

    async fn schedule_in_scope(&self, scope: &Scope, schedule_id: Uuid)
        -> Result<bool, StoreError>;

    async fn classes_for_lecturer(
        &self,
        lecturer_id: Uuid,
    ) -> Result<Vec<ClassOverview>, StoreError>;

    async fn student_totals(
        &self,
        scope: &Scope,
        course_id: Option<Uuid>,
    ) -> Result<Vec<StudentAttendanceSummary>, StoreError>;

    /// Everyone enrolled in `class_id` (scoped to the lecturer and course)
    /// with zeroed counts.
    async fn class_roster(
        &self,
        lecturer_id: Uuid,
        class_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<Vec<StudentAttendanceSummary>, StoreError>;

    async fn student_exists(&self, student_id: Uuid) -> Result<bool, StoreError>;

    async fn student_records(
        &self,
        student_id: Uuid,
        scope: &Scope,
    ) -> Result<Vec<StudentAttendanceRecord>, StoreError>;
}
