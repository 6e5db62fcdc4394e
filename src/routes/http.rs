//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::errors::EngineError;
use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(%body.learner_id, %body.program_id, ?body.level))]
pub async fn http_create_trail(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateTrailIn>,
) -> Result<impl IntoResponse, EngineError> {
  let map = create_trail(&state, &body.learner_id, &body.program_id, body.level).await?;
  info!(target: "trail", trail = %map.trail.id, rounds = map.rounds.len(), "HTTP trail served");
  Ok(Json(map))
}

#[instrument(level = "info", skip(state), fields(%q.learner_id, %q.program_id))]
pub async fn http_get_trail(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TrailQuery>,
) -> Result<impl IntoResponse, EngineError> {
  let map = get_trail_map(&state, &q.learner_id, &q.program_id)
    .await?
    .ok_or_else(|| EngineError::TrailNotFound(format!("{}/{}", q.learner_id, q.program_id)))?;
  Ok(Json(map))
}

#[instrument(level = "info", skip(state, body), fields(%body.learner_id, %body.mission_id, ?body.mode, body.proceed_anyway))]
pub async fn http_start_mission(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartIn>,
) -> Result<impl IntoResponse, EngineError> {
  let start = start_mission(
    &state,
    &body.learner_id,
    &body.mission_id,
    body.mode,
    body.proceed_anyway,
  )
  .await?;
  info!(target: "mission", id = %body.mission_id, "HTTP mission start served");
  Ok(Json(to_start_out(start)))
}

#[instrument(level = "info", skip(state, body), fields(%body.learner_id, %body.mission_id, %body.question_id))]
pub async fn http_submit_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<impl IntoResponse, EngineError> {
  let outcome = record_answer(
    &state,
    &body.learner_id,
    &body.mission_id,
    &body.question_id,
    body.selected_option,
  )
  .await?;
  info!(target: "mission", id = %body.mission_id, correct = outcome.is_correct, "HTTP answer recorded");
  Ok(Json(to_answer_out(&outcome)))
}

#[instrument(level = "info", skip(state, body), fields(%body.learner_id, %body.mission_id))]
pub async fn http_finish_mission(
  State(state): State<Arc<AppState>>,
  Json(body): Json<FinishIn>,
) -> Result<impl IntoResponse, EngineError> {
  let report = finish_mission(&state, &body.learner_id, &body.mission_id).await?;
  info!(
    target: "mission",
    id = %body.mission_id,
    score = report.score,
    needs_remediation = report.needs_remediation,
    "HTTP mission finish served"
  );
  Ok(Json(report))
}

#[instrument(level = "info", skip(state), fields(%q.learner_id, %q.mission_id))]
pub async fn http_resume_mission(
  State(state): State<Arc<AppState>>,
  Query(q): Query<MissionQuery>,
) -> Result<impl IntoResponse, EngineError> {
  let resume = resume_mission(&state, &q.learner_id, &q.mission_id).await?;
  Ok(Json(ResumeOut { resume }))
}

#[instrument(level = "info", skip(state), fields(%q.learner_id))]
pub async fn http_remediation_stats(
  State(state): State<Arc<AppState>>,
  Query(q): Query<StatsQuery>,
) -> impl IntoResponse {
  let stats = remediation_stats_for(&state, &q.learner_id).await;
  Json(stats)
}
