use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::services::scheduler::JobStatus;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub jobs: Vec<JobStatus>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    let status = match &state.scheduler {
        Some(scheduler) => SchedulerStatus {
            enabled: scheduler.is_started(),
            jobs: scheduler.status(),
        },
        None => SchedulerStatus {
            enabled: false,
            jobs: Vec::new(),
        },
    };
    Json(status)
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<JobStatus>> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Notification scheduler is not running".into()))?;

    scheduler
        .job_status(&name)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job '{}' not found", name)))
}
