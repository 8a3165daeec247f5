use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::buckets::Bucket;
use crate::error::StoreError;
use crate::models::{
    AttendanceDetail, AttendanceStatus, AttendanceSummary, BucketRow, ClassOverview,
    StudentAttendanceRecord, StudentAttendanceSummary,
};
use crate::store::{AttendanceStore, Scope};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const SCOPED_ATTENDANCE: &str = "FROM attendance a \
     JOIN schedules s ON a.schedule_id = s.schedule_id \
     JOIN classes c ON s.class_id = c.class_id";

/// Appends the lecturer (and class) restriction as the query's WHERE clause.
fn push_scope(builder: &mut QueryBuilder<'static, Postgres>, scope: &Scope) {
    builder.push(" WHERE c.lecturer_id = ");
    builder.push_bind(scope.lecturer_id);
    if let Some(class_id) = scope.class_id {
        builder.push(" AND c.class_id = ");
        builder.push_bind(class_id);
    }
}

/// Bucket boundaries are bound as two parallel arrays and unnested with
/// their ordinal, so every bucket survives the LEFT JOIN even when no
/// session falls inside it.
pub fn bucket_counts_query(
    scope: &Scope,
    buckets: &[Bucket],
) -> QueryBuilder<'static, Postgres> {
    let starts: Vec<NaiveDateTime> = buckets.iter().map(|bucket| bucket.start).collect();
    let ends: Vec<NaiveDateTime> = buckets.iter().map(|bucket| bucket.end).collect();

    let mut builder = QueryBuilder::new(
        "WITH buckets AS (SELECT b.ordinal, b.bucket_start, b.bucket_end FROM UNNEST(",
    );
    builder.push_bind(starts);
    builder.push("::timestamp[], ");
    builder.push_bind(ends);
    builder.push(
        "::timestamp[]) WITH ORDINALITY AS b(bucket_start, bucket_end, ordinal)), \
         scoped AS (SELECT s.start_time, a.status ",
    );
    builder.push(SCOPED_ATTENDANCE);
    push_scope(&mut builder, scope);
    builder.push(
        ") SELECT b.ordinal, \
            COUNT(d.status) FILTER (WHERE d.status = 'present') AS present, \
            COUNT(d.status) FILTER (WHERE d.status = 'late') AS late, \
            COUNT(d.status) FILTER (WHERE d.status = 'absent') AS absent \
         FROM buckets b \
         LEFT JOIN scoped d ON d.start_time >= b.bucket_start AND d.start_time < b.bucket_end \
         GROUP BY b.ordinal \
         ORDER BY b.ordinal",
    );
    builder
}

pub fn summary_query(scope: &Scope) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT COUNT(DISTINCT a.student_id) AS total_students, \
            COUNT(*) FILTER (WHERE a.status = 'absent') AS count_absent, \
            COUNT(*) FILTER (WHERE a.status = 'present') AS count_present, \
            COUNT(*) FILTER (WHERE a.status = 'late') AS count_late ",
    );
    builder.push(SCOPED_ATTENDANCE);
    push_scope(&mut builder, scope);
    builder
}

pub fn details_query(scope: &Scope, schedule_id: Option<Uuid>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT a.attendance_id, a.student_id, st.student_code, u.first_name, u.last_name, \
            a.schedule_id, c.class_id, c.class_name, cs.course_id, cs.course_name, \
            a.status, a.attendance_time, s.start_time, a.note, a.evidence_image_url ",
    );
    builder.push(SCOPED_ATTENDANCE);
    builder.push(
        " JOIN students st ON st.student_id = a.student_id \
          JOIN users u ON u.user_id = a.student_id \
          JOIN courses cs ON cs.course_id = c.course_id",
    );
    push_scope(&mut builder, scope);
    if let Some(schedule_id) = schedule_id {
        builder.push(" AND a.schedule_id = ");
        builder.push_bind(schedule_id);
    }
    builder.push(" ORDER BY s.start_time DESC, st.student_code");
    builder
}

pub fn student_totals_query(
    scope: &Scope,
    course_id: Option<Uuid>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT st.student_id, st.student_code, u.first_name || ' ' || u.last_name AS full_name, \
            COUNT(a.attendance_id) AS attendance_days, \
            COUNT(*) FILTER (WHERE a.status = 'present') AS present_days, \
            COUNT(*) FILTER (WHERE a.status = 'late') AS late_days, \
            COUNT(*) FILTER (WHERE a.status = 'absent') AS absent_days ",
    );
    builder.push(SCOPED_ATTENDANCE);
    builder.push(
        " JOIN students st ON st.student_id = a.student_id \
          JOIN users u ON u.user_id = st.student_id",
    );
    push_scope(&mut builder, scope);
    if let Some(course_id) = course_id {
        builder.push(" AND c.course_id = ");
        builder.push_bind(course_id);
    }
    builder.push(
        " GROUP BY st.student_id, st.student_code, u.first_name, u.last_name \
          ORDER BY st.student_code",
    );
    builder
}

fn detail_from_row(row: &PgRow) -> Result<AttendanceDetail, sqlx::Error> {
    Ok(AttendanceDetail {
        attendance_id: row.try_get("attendance_id")?,
        student_id: row.try_get("student_id")?,
        student_code: row.try_get("student_code")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        schedule_id: row.try_get("schedule_id")?,
        class_id: row.try_get("class_id")?,
        class_name: row.try_get("class_name")?,
        course_id: row.try_get("course_id")?,
        course_name: row.try_get("course_name")?,
        status: row.try_get("status")?,
        attendance_time: row.try_get("attendance_time")?,
        start_time: row.try_get("start_time")?,
        note: row.try_get("note")?,
        evidence_image_url: row.try_get("evidence_image_url")?,
    })
}

fn student_summary_from_row(row: &PgRow) -> Result<StudentAttendanceSummary, sqlx::Error> {
    Ok(StudentAttendanceSummary {
        student_id: row.try_get("student_id")?,
        student_code: row.try_get("student_code")?,
        full_name: row.try_get("full_name")?,
        attendance_days: row.try_get("attendance_days")?,
        present_days: row.try_get("present_days")?,
        late_days: row.try_get("late_days")?,
        absent_days: row.try_get("absent_days")?,
    })
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for PgStore {
    async fn bucket_counts(
        &self,
        scope: &Scope,
        buckets: &[Bucket],
    ) -> Result<Vec<BucketRow>, StoreError> {
        let rows = bucket_counts_query(scope, buckets)
            .build()
            .fetch_all(&self.pool)
            .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            counts.push(BucketRow {
                ordinal: row.try_get("ordinal")?,
                present: row.try_get("present")?,
                late: row.try_get("late")?,
                absent: row.try_get("absent")?,
            });
        }
        Ok(counts)
    }

    async fn summary(&self, scope: &Scope) -> Result<AttendanceSummary, StoreError> {
        let row = summary_query(scope).build().fetch_one(&self.pool).await?;
        Ok(AttendanceSummary {
            total_students: row.try_get("total_students")?,
            count_absent: row.try_get("count_absent")?,
            count_present: row.try_get("count_present")?,
            count_late: row.try_get("count_late")?,
        })
    }

    async fn details(
        &self,
        scope: &Scope,
        schedule_id: Option<Uuid>,
    ) -> Result<Vec<AttendanceDetail>, StoreError> {
        let rows = details_query(scope, schedule_id)
            .build()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(detail_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn schedule_in_scope(
        &self,
        scope: &Scope,
        schedule_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut builder = QueryBuilder::new(
            "SELECT EXISTS (SELECT 1 FROM schedules s JOIN classes c ON s.class_id = c.class_id",
        );
        push_scope(&mut builder, scope);
        builder.push(" AND s.schedule_id = ");
        builder.push_bind(schedule_id);
        builder.push(") AS found");

        let row = builder.build().fetch_one(&self.pool).await?;
        Ok(row.try_get("found")?)
    }

    async fn classes_for_lecturer(
        &self,
        lecturer_id: Uuid,
    ) -> Result<Vec<ClassOverview>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT cl.class_id, cl.class_name, cl.course_id, cs.course_name
            FROM classes cl
            JOIN courses cs ON cs.course_id = cl.course_id
            WHERE cl.lecturer_id = $1
            ORDER BY cl.class_name
            "#,
        )
        .bind(lecturer_id)
        .fetch_all(&self.pool)
        .await?;

        let mut classes = Vec::with_capacity(rows.len());
        for row in rows {
            classes.push(ClassOverview {
                class_id: row.try_get("class_id")?,
                class_name: row.try_get("class_name")?,
                course_id: row.try_get("course_id")?,
                course_name: row.try_get("course_name")?,
            });
        }
        Ok(classes)
    }

    async fn student_totals(
        &self,
        scope: &Scope,
        course_id: Option<Uuid>,
    ) -> Result<Vec<StudentAttendanceSummary>, StoreError> {
        let rows = student_totals_query(scope, course_id)
            .build()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(student_summary_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn class_roster(
        &self,
        lecturer_id: Uuid,
        class_id: Uuid,
        course_id: Option<Uuid>,
    ) -> Result<Vec<StudentAttendanceSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT st.student_id, st.student_code, u.first_name || ' ' || u.last_name AS full_name,
                   0::BIGINT AS attendance_days, 0::BIGINT AS present_days,
                   0::BIGINT AS late_days, 0::BIGINT AS absent_days
            FROM class_students cs
            JOIN students st ON cs.student_id = st.student_id
            JOIN users u ON st.student_id = u.user_id
            JOIN classes c ON cs.class_id = c.class_id
            WHERE cs.class_id = $1
              AND c.lecturer_id = $2
              AND ($3::uuid IS NULL OR c.course_id = $3)
            ORDER BY st.student_code
            "#,
        )
        .bind(class_id)
        .bind(lecturer_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(student_summary_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn student_exists(&self, student_id: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM students WHERE student_id = $1) AS found",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("found")?)
    }

    async fn student_records(
        &self,
        student_id: Uuid,
        scope: &Scope,
    ) -> Result<Vec<StudentAttendanceRecord>, StoreError> {
        let mut builder = QueryBuilder::new(
            "SELECT a.attendance_id, st.student_code, u.first_name, u.last_name, \
                cs.course_name, c.class_name, s.start_time, a.attendance_time, \
                a.status, a.note, a.evidence_image_url ",
        );
        builder.push(SCOPED_ATTENDANCE);
        builder.push(
            " JOIN students st ON st.student_id = a.student_id \
              JOIN users u ON u.user_id = st.student_id \
              JOIN courses cs ON cs.course_id = c.course_id",
        );
        push_scope(&mut builder, scope);
        builder.push(" AND a.student_id = ");
        builder.push_bind(student_id);
        builder.push(" ORDER BY s.start_time DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(StudentAttendanceRecord {
                attendance_id: row.try_get("attendance_id")?,
                student_code: row.try_get("student_code")?,
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                class_name: row.try_get("class_name")?,
                course_name: row.try_get("course_name")?,
                start_time: row.try_get("start_time")?,
                attendance_time: row.try_get("attendance_time")?,
                status: row.try_get("status")?,
                note: row.try_get("note")?,
                evidence_image_url: row.try_get("evidence_image_url")?,
            });
        }
        Ok(records)
    }
}

fn seed_status(student_index: usize, session_index: usize) -> AttendanceStatus {
    match (student_index * 3 + session_index) % 7 {
        0 => AttendanceStatus::Absent,
        1 | 4 => AttendanceStatus::Late,
        _ => AttendanceStatus::Present,
    }
}

/// Loads a small demo campus: two lecturers, three classes, weekly sessions
/// through the first term of 2026. Safe to run repeatedly.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let lecturers = vec![
        (
            Uuid::parse_str("6f1c2a8e-5d3b-4c1e-9a7f-2b8d4e6f1a30")?,
            "Linh",
            "Tran",
            "linh.tran@campus.edu",
        ),
        (
            Uuid::parse_str("a4e9b7c2-1f3d-4a6b-8c5e-7d2f9b1c3e40")?,
            "Marcus",
            "Okafor",
            "marcus.okafor@campus.edu",
        ),
    ];
    let students = vec![
        (
            Uuid::parse_str("1b2c3d4e-5f60-4718-8293-a4b5c6d7e801")?,
            "Avery",
            "Nguyen",
            "avery.nguyen@campus.edu",
            "20260001",
        ),
        (
            Uuid::parse_str("2c3d4e5f-6071-4829-93a4-b5c6d7e8f902")?,
            "Jules",
            "Moreno",
            "jules.moreno@campus.edu",
            "20260002",
        ),
        (
            Uuid::parse_str("3d4e5f60-7182-493a-a4b5-c6d7e8f90a03")?,
            "Kiara",
            "Patel",
            "kiara.patel@campus.edu",
            "20260003",
        ),
        (
            Uuid::parse_str("4e5f6071-8293-4a4b-b5c6-d7e8f90a1b04")?,
            "Tomas",
            "Berg",
            "tomas.berg@campus.edu",
            "20260004",
        ),
    ];

    for (id, first_name, last_name, email) in &lecturers {
        upsert_user(pool, *id, first_name, last_name, email, "lecturer").await?;
    }
    for (id, first_name, last_name, email, code) in &students {
        upsert_user(pool, *id, first_name, last_name, email, "student").await?;
        sqlx::query(
            r#"
            INSERT INTO students (student_id, student_code)
            VALUES ($1, $2)
            ON CONFLICT (student_id) DO UPDATE SET student_code = EXCLUDED.student_code
            "#,
        )
        .bind(id)
        .bind(code)
        .execute(pool)
        .await?;
    }

    let courses = vec![
        (
            Uuid::parse_str("c0a1b2c3-d4e5-4f60-8172-839405a6b701")?,
            "Database Systems",
            lecturers[0].0,
            12,
        ),
        (
            Uuid::parse_str("c1b2c3d4-e5f6-4071-8283-9405a6b7c802")?,
            "Computer Networks",
            lecturers[1].0,
            10,
        ),
    ];
    for (id, name, lecturer_id, total_lesson) in &courses {
        sqlx::query(
            r#"
            INSERT INTO courses (course_id, course_name, main_lecturer_id, total_lesson)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (course_id) DO UPDATE
            SET course_name = EXCLUDED.course_name, total_lesson = EXCLUDED.total_lesson
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(lecturer_id)
        .bind(total_lesson)
        .execute(pool)
        .await?;
    }

    let first_monday = NaiveDate::from_ymd_opt(2026, 1, 5).context("invalid date")?;
    let classes = vec![
        (
            Uuid::parse_str("d0e1f203-1425-4367-8899-aabbccdd0101")?,
            "DB-01",
            lecturers[0].0,
            courses[0].0,
            0i64,
            vec![0usize, 1, 2],
        ),
        (
            Uuid::parse_str("d1f20314-2536-4478-99aa-bbccddee0202")?,
            "DB-02",
            lecturers[0].0,
            courses[0].0,
            2,
            vec![2, 3],
        ),
        (
            Uuid::parse_str("d2031425-3647-4589-aabb-ccddeeff0303")?,
            "NET-01",
            lecturers[1].0,
            courses[1].0,
            3,
            vec![0, 1, 3],
        ),
    ];

    for (class_id, name, lecturer_id, course_id, day_offset, enrolled) in &classes {
        sqlx::query(
            r#"
            INSERT INTO classes (class_id, class_name, lecturer_id, course_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (class_id) DO UPDATE SET class_name = EXCLUDED.class_name
            "#,
        )
        .bind(class_id)
        .bind(name)
        .bind(lecturer_id)
        .bind(course_id)
        .execute(pool)
        .await?;

        for &student_index in enrolled {
            sqlx::query(
                r#"
                INSERT INTO class_students (class_id, student_id, status)
                VALUES ($1, $2, 'active')
                ON CONFLICT (class_id, student_id) DO NOTHING
                "#,
            )
            .bind(class_id)
            .bind(students[student_index].0)
            .execute(pool)
            .await?;
        }

        for session_index in 0..12usize {
            let day = first_monday + Duration::days(day_offset + 7 * session_index as i64);
            let start_time = day.and_hms_opt(8, 0, 0).context("invalid time")?;
            let end_time = start_time + Duration::hours(2);

            let schedule_id: Uuid = sqlx::query(
                r#"
                INSERT INTO schedules (schedule_id, class_id, start_time, end_time, topic)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (class_id, start_time) DO UPDATE SET end_time = EXCLUDED.end_time
                RETURNING schedule_id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(class_id)
            .bind(start_time)
            .bind(end_time)
            .bind(format!("{name} session {}", session_index + 1))
            .fetch_one(pool)
            .await?
            .get("schedule_id");

            for &student_index in enrolled {
                let status = seed_status(student_index, session_index);
                let attendance_time = match status {
                    AttendanceStatus::Absent => None,
                    AttendanceStatus::Late => Some(start_time + Duration::minutes(17)),
                    AttendanceStatus::Present => Some(start_time + Duration::minutes(2)),
                };

                sqlx::query(
                    r#"
                    INSERT INTO attendance
                    (attendance_id, student_id, schedule_id, status, attendance_time)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (student_id, schedule_id) DO NOTHING
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(students[student_index].0)
                .bind(schedule_id)
                .bind(status.as_str())
                .bind(attendance_time)
                .execute(pool)
                .await?;
            }
        }
    }

    Ok(())
}

async fn upsert_user(
    pool: &PgPool,
    id: Uuid,
    first_name: &str,
    last_name: &str,
    email: &str,
    role: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (user_id, first_name, last_name, email, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE
        SET first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name
        "#,
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(role)
    .execute(pool)
    .await?;
    Ok(())
}
