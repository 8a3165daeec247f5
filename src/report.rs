use std::fmt::Write;

use tracing::{debug, warn};

use crate::buckets::{plan_buckets, Bucket, Period, ReportMode};
use crate::error::AppError;
use crate::models::{BucketCount, BucketRow};
use crate::params::{optional_id, required_id, required_number, ReportQuery};
use crate::store::{AttendanceStore, Scope};

/// A validated report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub scope: Scope,
    pub period: Period,
}

impl ReportRequest {
    /// Validates raw parameters. `lecturer_id` wins over `query.lecturer_id`
    /// when the caller took it from the path.
    pub fn parse(lecturer_id: Option<&str>, query: &ReportQuery) -> Result<Self, AppError> {
        let lecturer_id = required_id(
            "lecturer_id",
            lecturer_id.or(query.lecturer_id.as_deref()),
        )?;
        let mode = ReportMode::parse(query.filter.as_deref())?;

        let year = required_number::<i32>("year", query.year.as_deref())?;
        let period = match mode {
            ReportMode::Year => Period::Year { year },
            ReportMode::Month => Period::Month {
                year,
                month: required_number("month", query.month.as_deref())?,
            },
            ReportMode::Week => Period::Week {
                year,
                month: required_number("month", query.month.as_deref())?,
                week: required_number("week", query.week.as_deref())?,
            },
        };
        let class_id = optional_id("class_id", query.class_id.as_deref())?;

        Ok(Self {
            scope: Scope::new(lecturer_id, class_id),
            period,
        })
    }

    pub fn mode(&self) -> ReportMode {
        self.period.mode()
    }
}

pub async fn generate_report(
    store: &dyn AttendanceStore,
    request: &ReportRequest,
) -> Result<Vec<BucketCount>, AppError> {
    let buckets = plan_buckets(&request.period)?;
    debug!(
        lecturer_id = %request.scope.lecturer_id,
        class_id = ?request.scope.class_id,
        mode = request.mode().as_str(),
        buckets = buckets.len(),
        "generating attendance report"
    );

    let rows = store.bucket_counts(&request.scope, &buckets).await?;
    Ok(assemble(&buckets, rows))
}

/// Lays store rows onto the bucket plan: one entry per bucket, in plan
/// order, zero where the store returned nothing.
pub fn assemble(buckets: &[Bucket], rows: Vec<BucketRow>) -> Vec<BucketCount> {
    let mut report: Vec<BucketCount> = buckets
        .iter()
        .map(|bucket| BucketCount::empty(bucket.label.clone()))
        .collect();

    for row in rows {
        let slot = usize::try_from(row.ordinal)
            .ok()
            .and_then(|ordinal| ordinal.checked_sub(1))
            .and_then(|index| report.get_mut(index));
        match slot {
            Some(entry) => {
                entry.present += row.present;
                entry.late += row.late;
                entry.absent += row.absent;
            }
            None => warn!(ordinal = row.ordinal, "dropping row outside bucket plan"),
        }
    }

    report
}

pub fn period_caption(period: &Period) -> String {
    match *period {
        Period::Year { year } => format!("year {year}"),
        Period::Month { year, month } => format!("{year}-{month:02}"),
        Period::Week { year, month, week } => format!("week {week} of {year}-{month:02}"),
    }
}

pub fn render_markdown(request: &ReportRequest, report: &[BucketCount]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Lecturer {} ({}), {} view",
        request.scope.lecturer_id,
        request
            .scope
            .class_id
            .map(|id| format!("class {id}"))
            .unwrap_or_else(|| "all classes".to_string()),
        period_caption(&request.period)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "| Period | Present | Late | Absent |");
    let _ = writeln!(output, "| --- | ---: | ---: | ---: |");

    for entry in report {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            entry.period, entry.present, entry.late, entry.absent
        );
    }

    let present: i64 = report.iter().map(|entry| entry.present).sum();
    let late: i64 = report.iter().map(|entry| entry.late).sum();
    let absent: i64 = report.iter().map(|entry| entry.absent).sum();
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Totals: {present} present, {late} late, {absent} absent"
    );

    output
}

pub fn write_csv<W: std::io::Write>(writer: W, report: &[BucketCount]) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in report {
        csv_writer.serialize(entry)?;
    }
    csv_writer.flush()?;
    Ok(())
}
