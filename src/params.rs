//! Raw query-string parameters and their validation.
//!
//! Every field arrives as an optional string so that malformed values surface
//! as our own validation messages instead of extractor rejections.

use std::str::FromStr;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub lecturer_id: Option<String>,
    pub filter: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
    pub week: Option<String>,
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeQuery {
    pub lecturer_id: Option<String>,
    pub class_id: Option<String>,
    pub schedule_id: Option<String>,
    pub course_id: Option<String>,
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

pub fn required_id(field: &str, raw: Option<&str>) -> Result<Uuid, AppError> {
    let value = non_blank(raw).ok_or_else(|| AppError::validation(format!("Missing {field}")))?;
    Uuid::parse_str(value).map_err(|_| AppError::validation(format!("Invalid {field}")))
}

pub fn optional_id(field: &str, raw: Option<&str>) -> Result<Option<Uuid>, AppError> {
    non_blank(raw)
        .map(|value| {
            Uuid::parse_str(value).map_err(|_| AppError::validation(format!("Invalid {field}")))
        })
        .transpose()
}

pub fn required_number<T: FromStr>(field: &str, raw: Option<&str>) -> Result<T, AppError> {
    non_blank(raw)
        .and_then(|value| value.parse::<T>().ok())
        .ok_or_else(|| AppError::validation(format!("Invalid {field}")))
}
