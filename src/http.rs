use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::attendance;
use crate::error::AppError;
use crate::models::{
    AttendanceDetail, AttendanceSummary, BucketCount, ClassOverview, StudentAttendanceRecord,
    StudentAttendanceSummary,
};
use crate::params::{optional_id, required_id, ReportQuery, ScopeQuery};
use crate::report::{generate_report, ReportRequest};
use crate::store::{AttendanceStore, Scope};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AttendanceStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/attendance-report", get(report_query_handler))
        .route("/attendance-report/:lecturer_id", get(report_handler))
        .route("/attendance-summary", get(summary_handler))
        .route("/attendance-detail", get(detail_handler))
        .route("/classes/:lecturer_id", get(classes_handler))
        .route(
            "/student-attendance-summary/:lecturer_id",
            get(student_summary_handler),
        )
        .route(
            "/student-attendances/:student_id/:lecturer_id",
            get(student_records_handler),
        )
        .route(
            "/get-student-attendances/:student_id/:lecturer_id",
            get(student_records_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let app = build_router(state);

    info!("Binding to {bind}");
    let listener = TcpListener::bind(bind).await?;
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn report_handler(
    State(state): State<AppState>,
    Path(lecturer_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<BucketCount>>, AppError> {
    let request = ReportRequest::parse(Some(lecturer_id.as_str()), &query)?;
    Ok(Json(generate_report(state.store.as_ref(), &request).await?))
}

async fn report_query_handler(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<BucketCount>>, AppError> {
    let request = ReportRequest::parse(None, &query)?;
    Ok(Json(generate_report(state.store.as_ref(), &request).await?))
}

async fn summary_handler(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let scope = attendance::parse_scope(&query)?;
    Ok(Json(attendance::summary(state.store.as_ref(), &scope).await?))
}

async fn detail_handler(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<AttendanceDetail>>, AppError> {
    let scope = attendance::parse_scope(&query)?;
    let schedule_id = optional_id("schedule_id", query.schedule_id.as_deref())?;
    Ok(Json(
        attendance::details(state.store.as_ref(), &scope, schedule_id).await?,
    ))
}

async fn classes_handler(
    State(state): State<AppState>,
    Path(lecturer_id): Path<String>,
) -> Result<Json<Vec<ClassOverview>>, AppError> {
    let lecturer_id = required_id("lecturer_id", Some(lecturer_id.as_str()))?;
    Ok(Json(
        attendance::classes_for_lecturer(state.store.as_ref(), lecturer_id).await?,
    ))
}

async fn student_summary_handler(
    State(state): State<AppState>,
    Path(lecturer_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<StudentAttendanceSummary>>, AppError> {
    let lecturer_id = required_id("lecturer_id", Some(lecturer_id.as_str()))?;
    let class_id = optional_id("class_id", query.class_id.as_deref())?;
    let course_id = optional_id("course_id", query.course_id.as_deref())?;
    let scope = Scope::new(lecturer_id, class_id);
    Ok(Json(
        attendance::student_summary(state.store.as_ref(), &scope, course_id).await?,
    ))
}

async fn student_records_handler(
    State(state): State<AppState>,
    Path((student_id, lecturer_id)): Path<(String, String)>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<StudentAttendanceRecord>>, AppError> {
    let student_id = required_id("student_id", Some(student_id.as_str()))?;
    let lecturer_id = required_id("lecturer_id", Some(lecturer_id.as_str()))?;
    let class_id = optional_id("class_id", query.class_id.as_deref())?;
    let scope = Scope::new(lecturer_id, class_id);
    Ok(Json(
        attendance::student_records(state.store.as_ref(), student_id, &scope).await?,
    ))
}
