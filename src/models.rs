use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a bucketed report, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub period: String,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
}

impl BucketCount {
    pub fn empty(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            present: 0,
            late: 0,
            absent: 0,
        }
    }

    pub fn total(&self) -> i64 {
        self.present + self.late + self.absent
    }
}

/// Raw aggregate row for one bucket. `ordinal` is the 1-based position of the
/// bucket in the plan that was sent to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRow {
    pub ordinal: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub total_students: i64,
    pub count_absent: i64,
    pub count_present: i64,
    pub count_late: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceDetail {
    pub attendance_id: Uuid,
    pub student_id: Uuid,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub schedule_id: Uuid,
    pub class_id: Uuid,
    pub class_name: String,
    pub course_id: Uuid,
    pub course_name: String,
    pub status: String,
    pub attendance_time: Option<NaiveDateTime>,
    pub start_time: NaiveDateTime,
    pub note: Option<String>,
    pub evidence_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOverview {
    pub class_id: Uuid,
    pub class_name: String,
    pub course_id: Uuid,
    pub course_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceSummary {
    pub student_id: Uuid,
    pub student_code: String,
    pub full_name: String,
    pub attendance_days: i64,
    pub present_days: i64,
    pub late_days: i64,
    pub absent_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAttendanceRecord {
    pub attendance_id: Uuid,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub class_name: String,
    pub course_name: String,
    pub start_time: NaiveDateTime,
    pub attendance_time: Option<NaiveDateTime>,
    pub status: String,
    pub note: Option<String>,
    pub evidence_image_url: Option<String>,
}
