#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use attendance_report::models::{
    AttendanceDetail, AttendanceSummary, ClassOverview, StudentAttendanceRecord,
    StudentAttendanceSummary,
};
use attendance_report::{AttendanceStatus, AttendanceStore, Bucket, BucketRow, Scope, StoreError};
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

#[derive(Clone)]
pub struct Student {
    pub id: Uuid,
    pub code: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub lecturer_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Clone)]
pub struct Session {
    pub id: Uuid,
    pub class_id: Uuid,
    pub start_time: NaiveDateTime,
}

#[derive(Clone)]
pub struct Record {
    pub id: Uuid,
    pub student_id: Uuid,
    pub schedule_id: Uuid,
    pub status: AttendanceStatus,
}

#[derive(Default)]
struct Tables {
    students: Vec<Student>,
    courses: Vec<Course>,
    classes: Vec<Class>,
    roster: Vec<(Uuid, Uuid)>,
    sessions: Vec<Session>,
    records: Vec<Record>,
}

/// In-memory stand-in for the Postgres store, following the same joins.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: bool,
    calls: AtomicUsize,
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .expect("valid timestamp")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Number of store queries issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn add_student(&self, code: &str, first_name: &str, last_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().students.push(Student {
            id,
            code: code.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        });
        id
    }

    pub fn add_course(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().courses.push(Course {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_class(&self, name: &str, lecturer_id: Uuid, course_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().classes.push(Class {
            id,
            name: name.to_string(),
            lecturer_id,
            course_id,
        });
        id
    }

    pub fn enroll(&self, class_id: Uuid, student_id: Uuid) {
        self.tables.lock().unwrap().roster.push((class_id, student_id));
    }

    pub fn add_session(&self, class_id: Uuid, start_time: NaiveDateTime) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().sessions.push(Session {
            id,
            class_id,
            start_time,
        });
        id
    }

    pub fn record(&self, student_id: Uuid, schedule_id: Uuid, status: AttendanceStatus) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().records.push(Record {
            id,
            student_id,
            schedule_id,
            status,
        });
        id
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

struct Joined {
    record: Record,
    session: Session,
    class: Class,
    student: Student,
    course: Course,
}

impl Tables {
    fn in_scope(class: &Class, scope: &Scope) -> bool {
        class.lecturer_id == scope.lecturer_id
            && scope.class_id.map_or(true, |class_id| class.id == class_id)
    }

    fn joined(&self, scope: &Scope) -> Vec<Joined> {
        self.records
            .iter()
            .filter_map(|record| {
                let session = self.sessions.iter().find(|s| s.id == record.schedule_id)?;
                let class = self.classes.iter().find(|c| c.id == session.class_id)?;
                if !Self::in_scope(class, scope) {
                    return None;
                }
                let student = self.students.iter().find(|s| s.id == record.student_id)?;
                let course = self.courses.iter().find(|c| c.id == class.course_id)?;
                Some(Joined {
                    record: record.clone(),
                    session: session.clone(),
                    class: class.clone(),
                    student: student.clone(),
                    course: course.clone(),
                })
            })
            .collect()
    }
}

fn count(rows: &[&Joined], status: AttendanceStatus) -> i64 {
    rows.iter().filter(|row| row.record.status == status).count() as i64
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn bucket_counts(
        &self,
        scope: &Scope,
        buckets: &[Bucket],
    ) -> Result<Vec<BucketRow>, StoreError> {
        self.begin()?;
        let joined = self.tables.lock().unwrap().joined(scope);
        Ok(buckets
            .iter()
            .enumerate()
            .map(|(index, bucket)| {
                let inside: Vec<&Joined> = joined
                    .iter()
                    .filter(|row| bucket.contains(row.session.start_time))
                    .collect();
                BucketRow {
                    ordinal: index as i64 + 1,
                    present: count(&inside, AttendanceStatus::Present),
                    late: count(&inside, AttendanceStatus::Late),
                    absent: count(&inside, AttendanceStatus::Absent),
                }
            })
            .collect())
    }

    async fn summary(&self, scope: &Scope) -> Result<AttendanceSummary, StoreError> {
        self.begin()?;
        let joined = self.tables.lock().unwrap().joined(scope);
        let rows: Vec<&Joined> = joined.iter().collect();
        let mut students: Vec<Uuid> = rows.iter().map(|row| row.student.id).collect();
        students.sort();
        students.dedup();
        Ok(AttendanceSummary {
            total_students: students.len() as i64,
            count_absent: count(&rows, AttendanceStatus::Absent),
            count_present: count(&rows, AttendanceStatus::Present),
            count_late: count(&rows, AttendanceStatus::Late),
        })
    }

    async fn details(
        &self,
        scope: &Scope,
        schedule_id: Option<Uuid>,
    ) -> Result<Vec<AttendanceDetail>, StoreError> {
        self.begin()?;
        let mut joined = self.tables.lock().unwrap().joined(scope);
        joined.retain(|row| schedule_id.map_or(true, |id| row.session.id == id));
        joined.sort_by(|a, b| {
            b.session
                .start_time
                .cmp(&a.session.start_time)
                .then_with(|| a.student.code.cmp(&b.student.code))
        });
        Ok(joined
            .into_iter()
            .map(|row| AttendanceDetail {
                attendance_id: row.record.id,
                student_id: row.student.id,
                student_code: row.student.code,
                first_name: row.student.first_name,
                last_name: row.student.last_name,
                schedule_id: row.session.id,
                class_id: row.class.id,
                class_name: row.class.name,
                course_id: row.course.id,
                course_name: row.course.name,
                status: row.record.status.to_string(),
                attendance_time: None,
                start_time: row.session.start_time,
                note: None,
                evidence_image_url: None,
            })
            .collect())
    }

    async fn schedule_in_scope(
        &self,
        scope: &Scope,
        schedule_id: Uuid,
    ) -> Result<bool, StoreError> {
        self.begin()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .sessions
            .iter()
            .filter(|session| session.id == schedule_id)
            .any(|session| {
                tables
                    .classes
                    .iter()
                    .any(|class| class.id == session.class_id && Tables::in_scope(class, scope))
            }))
    }

    async fn classes_for_lecturer(
        &self,
        lecturer_id: Uuid,
    ) -> Result<Vec<ClassOverview>, StoreError> {
        self.begin()?;
        let tables = self.tables.lock().unwrap();
        let mut classes: Vec<ClassOverview> = tables
            .classes
            .iter()
            .filter(|class| class.lecturer_id == lecturer_id)
            .filter_map(|class| {
                let course = tables.courses.iter().find(|c| c.id == class.course_id)?;
                Some(ClassOverview {
                    class_id: class.id,
                    class_name: class.name.clone(),
                    course_id: course.id,
                    course_name: course.name.clone(),
                })
            })
            .collect();
        classes.sort_by(|a, b| a.class_name.cmp(&b.class_name));
        Ok(classes)
    }

    async fn student_totals(
        &self,
        scope: &Scope,
        course_id: Option<Uuid>,
    ) -> Result<Vec<StudentAttendanceSummary>, StoreError> {
        self.begin()?;
        let joined: Vec<Joined> = self
            .tables
            .lock()
            .unwrap()
            .joined(scope)
            .into_iter()
            .filter(|row| course_id.map_or(true, |id| row.course.id == id))
            .collect();

        let mut students: Vec<&Student> = Vec::new();
        for row in &joined {
            if !students.iter().any(|s| s.id == row.student.id) {
                students.push(&row.student);
            }
        }
        students.sort_by(|a, b| a.code.cmp(&b.code));

        Ok(students
            .into_iter()
            .map(|student| {
                let rows: Vec<&Joined> = joined
                    .iter()
                    .filter(|row| row.student.id == student.id)
                    .collect();
                StudentAttendanceSummary {
                    student_id: student.id,
                    student_code: student.code.clone(),
                    full_name: format!("{} {}", student.first_name, student.last_name),
                    attendance_days: rows.len() as i64,
                    present_days: count(&rows, AttendanceStatus::Present),
                    late_days: count(&rows, AttendanceStatus::Late),
                    absent_days: count(&rows, AttendanceStatus::Absent),
                }
            })
            .collect())
    }

    async fn class_roster(
        &self,
        lecturer_id: Uuid,
        class_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<Vec<StudentAttendanceSummary>, StoreError> {
        self.begin()?;
        let tables = self.tables.lock().unwrap();
        let class_matches = tables.classes.iter().any(|class| {
            class.id == class_id
                && class.lecturer_id == lecturer_id
                && course_id.map_or(true, |id| class.course_id == id)
        });
        if !class_matches {
            return Ok(Vec::new());
        }

        let mut roster: Vec<StudentAttendanceSummary> = tables
            .roster
            .iter()
            .filter(|(class, _)| *class == class_id)
            .filter_map(|(_, student_id)| tables.students.iter().find(|s| s.id == *student_id))
            .map(|student| StudentAttendanceSummary {
                student_id: student.id,
                student_code: student.code.clone(),
                full_name: format!("{} {}", student.first_name, student.last_name),
                attendance_days: 0,
                present_days: 0,
                late_days: 0,
                absent_days: 0,
            })
            .collect();
        roster.sort_by(|a, b| a.student_code.cmp(&b.student_code));
        Ok(roster)
    }

    async fn student_exists(&self, student_id: Uuid) -> Result<bool, StoreError> {
        self.begin()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .students
            .iter()
            .any(|student| student.id == student_id))
    }

    async fn student_records(
        &self,
        student_id: Uuid,
        scope: &Scope,
    ) -> Result<Vec<StudentAttendanceRecord>, StoreError> {
        self.begin()?;
        let mut joined: Vec<Joined> = self
            .tables
            .lock()
            .unwrap()
            .joined(scope)
            .into_iter()
            .filter(|row| row.student.id == student_id)
            .collect();
        joined.sort_by(|a, b| b.session.start_time.cmp(&a.session.start_time));
        Ok(joined
            .into_iter()
            .map(|row| StudentAttendanceRecord {
                attendance_id: row.record.id,
                student_code: row.student.code,
                first_name: row.student.first_name,
                last_name: row.student.last_name,
                class_name: row.class.name,
                course_name: row.course.name,
                start_time: row.session.start_time,
                attendance_time: None,
                status: row.record.status.to_string(),
                note: None,
                evidence_image_url: None,
            })
            .collect())
    }
}

/// A lecturer with one class, one course and two enrolled students.
pub struct Campus {
    pub store: MemoryStore,
    pub lecturer: Uuid,
    pub other_lecturer: Uuid,
    pub course: Uuid,
    pub class: Uuid,
    pub second_class: Uuid,
    pub foreign_class: Uuid,
    pub avery: Uuid,
    pub jules: Uuid,
}

impl Campus {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let lecturer = Uuid::new_v4();
        let other_lecturer = Uuid::new_v4();
        let course = store.add_course("Database Systems");
        let class = store.add_class("DB-01", lecturer, course);
        let second_class = store.add_class("DB-02", lecturer, course);
        let foreign_class = store.add_class("NET-01", other_lecturer, course);
        let avery = store.add_student("20260001", "Avery", "Nguyen");
        let jules = store.add_student("20260002", "Jules", "Moreno");
        store.enroll(class, avery);
        store.enroll(class, jules);

        Self {
            store,
            lecturer,
            other_lecturer,
            course,
            class,
            second_class,
            foreign_class,
            avery,
            jules,
        }
    }
}
