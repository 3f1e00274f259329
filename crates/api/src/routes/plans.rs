//! Plan routes, including exam file uploads and the analysis pipeline.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use database::plan::{self, NewPlan, PlanUpdate};
use database::{
    agent_context, AgentContext, AgentKind, Exam, FileRef, IfmMatrix, PatientData, Plan,
    PlanContent, PlanStatus, TcmObservations, TimelineEvent,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::analysis::{self, StageOutcome, StageProgress};
use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::upload::spool_field;

#[derive(Deserialize, Default)]
pub struct ListPlansQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    #[serde(default)]
    pub patient: PatientData,
}

/// Documents to replace. Absent fields are left untouched.
#[derive(Deserialize, Default)]
pub struct UpdatePlanRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub patient: Option<PatientData>,
    #[serde(default)]
    pub exams: Option<Vec<Exam>>,
    #[serde(default)]
    pub tcm: Option<TcmObservations>,
    #[serde(default)]
    pub timeline: Option<Vec<TimelineEvent>>,
    #[serde(default)]
    pub ifm_matrix: Option<IfmMatrix>,
    #[serde(default)]
    pub content: Option<PlanContent>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: PlanStatus,
}

#[derive(Deserialize, Default)]
pub struct AnalysisQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn list_plans(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListPlansQuery>,
) -> Result<Json<Vec<Plan>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<PlanStatus>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let plans = plan::list_plans(state.db.pool(), auth.company_id(), status).await?;
    Ok(Json(plans))
}

pub async fn create_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<Plan>)> {
    let created = plan::create_plan(
        state.db.pool(),
        &NewPlan {
            company_id: auth.company_id().to_string(),
            created_by: auth.id().to_string(),
            title: req.title,
            patient: req.patient,
        },
    )
    .await?;

    info!(plan_id = %created.id, user_id = %auth.id(), "Plan created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Plan>> {
    let found = plan::get_plan(state.db.pool(), auth.company_id(), &id).await?;
    Ok(Json(found))
}

/// Replace plan documents. The status only changes through the status route.
pub async fn update_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdatePlanRequest>,
) -> Result<Json<Plan>> {
    let updated = plan::update_plan(
        state.db.pool(),
        auth.company_id(),
        &id,
        PlanUpdate {
            title: req.title,
            patient: req.patient,
            exams: req.exams,
            tcm: req.tcm,
            timeline: req.timeline,
            ifm_matrix: req.ifm_matrix,
            content: req.content,
        },
    )
    .await?;

    Ok(Json(updated))
}

pub async fn change_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Plan>> {
    let updated =
        plan::transition_status(state.db.pool(), auth.company_id(), &id, req.status).await?;
    Ok(Json(updated))
}

/// Upload a file (multipart field `file`) and attach it to an exam.
pub async fn upload_exam_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, exam_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Plan>)> {
    let pool = state.db.pool();
    let current = plan::get_plan(pool, auth.company_id(), &id).await?;
    if !current.exams.iter().any(|exam| exam.id == exam_id) {
        return Err(ApiError::NotFound("Exam".to_string()));
    }

    let mut spooled = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            spooled = Some(spool_field(field).await?);
            break;
        }
    }
    let spooled = spooled.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    let uploaded = state
        .documents
        .upload(
            spooled.temp.path(),
            &spooled.file_name,
            &spooled.content_type,
            auth.company_id(),
        )
        .await?;

    let file = FileRef {
        object_name: uploaded.object_name.clone(),
        name: uploaded.original_name,
        url: uploaded.url,
        size: uploaded.size,
        content_type: uploaded.content_type,
    };

    match plan::attach_exam_file(pool, auth.company_id(), &id, &exam_id, file).await {
        Ok(updated) => {
            info!(plan_id = %id, exam_id = %exam_id, object = %uploaded.object_name, "Exam file attached");
            Ok((StatusCode::CREATED, Json(updated)))
        }
        Err(e) => {
            if let Err(cleanup) = state.documents.remove(&uploaded.object_name).await {
                warn!(object = %uploaded.object_name, "Orphaned upload left behind: {}", cleanup);
            }
            Err(e.into())
        }
    }
}

/// Run one analysis stage (`exam-analysis`, `tcm-analysis`, `ifm-analysis`,
/// `plan-generation`). `?force=true` ignores a stored result.
pub async fn run_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, stage)): Path<(String, String)>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<StageOutcome>> {
    let stage = AgentKind::from_slug(&stage)
        .ok_or_else(|| ApiError::NotFound(format!("Analysis stage {}", stage)))?;

    let outcome = analysis::run_stage(&state, auth.company_id(), &id, stage, query.force).await?;
    Ok(Json(outcome))
}

/// Last progress reported for the plan's most recent stage run.
pub async fn analysis_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Option<StageProgress>>> {
    plan::get_plan(state.db.pool(), auth.company_id(), &id).await?;
    Ok(Json(state.progress.get(&id)))
}

pub async fn list_contexts(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<AgentContext>>> {
    plan::get_plan(state.db.pool(), auth.company_id(), &id).await?;
    let contexts = agent_context::list_contexts(state.db.pool(), auth.company_id(), &id).await?;
    Ok(Json(contexts))
}
