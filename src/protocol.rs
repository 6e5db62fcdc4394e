//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Questions cross this boundary without their answer key; grading is
//! server-side only.

use serde::{Deserialize, Serialize};

use crate::content::ContentStatus;
use crate::domain::{Level, Mission, Question, StudyMode};
use crate::logic::{AnswerOutcome, FinishReport, StartMission, TrailMap};
use crate::massification::RemediationStats;
use crate::progress::ResumedState;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    CreateTrail {
        learner_id: String,
        program_id: String,
        #[serde(default)]
        level: Level,
    },
    GetTrail {
        learner_id: String,
        program_id: String,
    },
    StartMission {
        learner_id: String,
        mission_id: String,
        #[serde(default)]
        mode: StudyMode,
        #[serde(default)]
        proceed_anyway: bool,
    },
    SubmitAnswer {
        learner_id: String,
        mission_id: String,
        question_id: String,
        selected_option: String,
    },
    FinishMission {
        learner_id: String,
        mission_id: String,
    },
    ResumeMission {
        learner_id: String,
        mission_id: String,
    },
    RemediationStats {
        learner_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Trail {
        trail: TrailMap,
    },
    TrailMissing,
    MissionStart(StartOut),
    AnswerResult(AnswerOut),
    MissionFinished {
        report: FinishReport,
    },
    Resume {
        resume: Option<ResumedState>,
    },
    RemediationStats {
        stats: RemediationStats,
    },
    Error {
        message: String,
    },
}

/// Question DTO: the answer key never leaves the server.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

pub fn to_question_out(q: &Question) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        prompt: q.prompt.clone(),
        options: q.options.clone(),
    }
}

/// Start outcome DTO shared by WS and HTTP.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOut {
    Started {
        mission: Mission,
        questions: Vec<QuestionOut>,
        content: ContentStatus,
        resume: Option<ResumedState>,
    },
    ChoiceRequired {
        pending_mission_ids: Vec<String>,
    },
}

pub fn to_start_out(start: StartMission) -> StartOut {
    match start {
        StartMission::Started { mission, questions, content, resume } => StartOut::Started {
            mission,
            questions: questions.iter().map(to_question_out).collect(),
            content,
            resume,
        },
        StartMission::ChoiceRequired { pending_mission_ids } => {
            StartOut::ChoiceRequired { pending_mission_ids }
        }
    }
}

/// Answer feedback DTO: reveals the correct option only after the learner
/// has committed an answer for that question.
#[derive(Debug, Serialize)]
pub struct AnswerOut {
    pub is_correct: bool,
    pub correct_option: String,
    pub current_question_index: usize,
    pub answered: usize,
}

pub fn to_answer_out(outcome: &AnswerOutcome) -> AnswerOut {
    AnswerOut {
        is_correct: outcome.is_correct,
        correct_option: outcome.correct_option.clone(),
        current_question_index: outcome.progress.current_question_index,
        answered: outcome.progress.answers.len(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct CreateTrailIn {
    pub learner_id: String,
    pub program_id: String,
    #[serde(default)]
    pub level: Level,
}

#[derive(Debug, Deserialize)]
pub struct TrailQuery {
    pub learner_id: String,
    pub program_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StartIn {
    pub learner_id: String,
    pub mission_id: String,
    #[serde(default)]
    pub mode: StudyMode,
    #[serde(default)]
    pub proceed_anyway: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub learner_id: String,
    pub mission_id: String,
    pub question_id: String,
    pub selected_option: String,
}

#[derive(Debug, Deserialize)]
pub struct FinishIn {
    pub learner_id: String,
    pub mission_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MissionQuery {
    pub learner_id: String,
    pub mission_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub learner_id: String,
}

#[derive(Serialize)]
pub struct ResumeOut {
    pub resume: Option<ResumedState>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
    pub retryable: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
