//! Un-bucketed read paths sharing the report scoping rules: lecturer
//! required, class optional.

use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    AttendanceDetail, AttendanceSummary, ClassOverview, StudentAttendanceRecord,
    StudentAttendanceSummary,
};
use crate::params::{optional_id, required_id, ScopeQuery};
use crate::store::{AttendanceStore, Scope};

pub fn parse_scope(query: &ScopeQuery) -> Result<Scope, AppError> {
    let lecturer_id = required_id("lecturer_id", query.lecturer_id.as_deref())?;
    let class_id = optional_id("class_id", query.class_id.as_deref())?;
    Ok(Scope::new(lecturer_id, class_id))
}

pub async fn summary(
    store: &dyn AttendanceStore,
    scope: &Scope,
) -> Result<AttendanceSummary, AppError> {
    Ok(store.summary(scope).await?)
}

/// Row-level listing, newest session first. A schedule filter that points
/// outside the scope is a missing entity, not an empty listing.
pub async fn details(
    store: &dyn AttendanceStore,
    scope: &Scope,
    schedule_id: Option<Uuid>,
) -> Result<Vec<AttendanceDetail>, AppError> {
    if let Some(schedule_id) = schedule_id {
        if !store.schedule_in_scope(scope, schedule_id).await? {
            return Err(AppError::not_found(format!(
                "Schedule {schedule_id} not found for lecturer"
            )));
        }
    }

    Ok(store.details(scope, schedule_id).await?)
}

pub async fn classes_for_lecturer(
    store: &dyn AttendanceStore,
    lecturer_id: Uuid,
) -> Result<Vec<ClassOverview>, AppError> {
    Ok(store.classes_for_lecturer(lecturer_id).await?)
}

/// Per-student totals. When nobody has attendance yet and a class was
/// named, the class roster is reported with zero counts instead.
pub async fn student_summary(
    store: &dyn AttendanceStore,
    scope: &Scope,
    course_id: Option<Uuid>,
) -> Result<Vec<StudentAttendanceSummary>, AppError> {
    let totals = store.student_totals(scope, course_id).await?;
    if !totals.is_empty() {
        return Ok(totals);
    }

    match scope.class_id {
        Some(class_id) => {
            debug!(%class_id, "no attendance yet, falling back to class roster");
            Ok(store
                .class_roster(scope.lecturer_id, class_id, course_id)
                .await?)
        }
        None => Ok(totals),
    }
}

pub async fn student_records(
    store: &dyn AttendanceStore,
    student_id: Uuid,
    scope: &Scope,
) -> Result<Vec<StudentAttendanceRecord>, AppError> {
    if !store.student_exists(student_id).await? {
        return Err(AppError::not_found(format!("Student {student_id} not found")));
    }

    Ok(store.student_records(student_id, scope).await?)
}
