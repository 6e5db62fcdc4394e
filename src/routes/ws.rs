//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{to_answer_out, to_start_out, ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "trail_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "trail_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        debug!(target = "trail_backend", "WS text: {}", trunc_for_log(&txt, 256));
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => handle_client_ws(incoming, &state).await,
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "trail_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "trail_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::CreateTrail { learner_id, program_id, level } => {
      match create_trail(state, &learner_id, &program_id, level).await {
        Ok(map) => {
          tracing::info!(target: "trail", trail = %map.trail.id, "WS trail served");
          ServerWsMessage::Trail { trail: map }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::GetTrail { learner_id, program_id } => {
      match get_trail_map(state, &learner_id, &program_id).await {
        Ok(Some(map)) => ServerWsMessage::Trail { trail: map },
        Ok(None) => ServerWsMessage::TrailMissing,
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::StartMission { learner_id, mission_id, mode, proceed_anyway } => {
      match start_mission(state, &learner_id, &mission_id, mode, proceed_anyway).await {
        Ok(start) => {
          tracing::info!(target: "mission", id = %mission_id, "WS mission start served");
          ServerWsMessage::MissionStart(to_start_out(start))
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::SubmitAnswer { learner_id, mission_id, question_id, selected_option } => {
      match record_answer(state, &learner_id, &mission_id, &question_id, selected_option).await {
        Ok(outcome) => {
          tracing::info!(target: "mission", id = %mission_id, correct = outcome.is_correct, "WS answer recorded");
          ServerWsMessage::AnswerResult(to_answer_out(&outcome))
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::FinishMission { learner_id, mission_id } => {
      match finish_mission(state, &learner_id, &mission_id).await {
        Ok(report) => {
          tracing::info!(target: "mission", id = %mission_id, score = report.score, "WS mission finish served");
          ServerWsMessage::MissionFinished { report }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::ResumeMission { learner_id, mission_id } => {
      match resume_mission(state, &learner_id, &mission_id).await {
        Ok(resume) => ServerWsMessage::Resume { resume },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::RemediationStats { learner_id } => {
      let stats = remediation_stats_for(state, &learner_id).await;
      ServerWsMessage::RemediationStats { stats }
    }
  }
}
