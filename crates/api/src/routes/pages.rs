//! Server-rendered dashboard pages.

use askama::Template;
use axum::extract::{Path, State};
use database::{agent_context, company, material, plan, AgentContext, Plan, PlanStatus};

use crate::analysis::stored_result;
use crate::auth::AuthUser;
use crate::error::Result;
use crate::state::AppState;

/// Plans shown on the dashboard.
const RECENT_PLANS: usize = 10;

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub company_name: String,
    pub user_name: String,
    pub status_counts: Vec<StatusCount>,
    pub recent_plans: Vec<PlanRow>,
    pub material_count: i64,
    pub analyzer: String,
}

pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

pub struct PlanRow {
    pub id: String,
    pub title: String,
    pub patient: String,
    pub status: String,
    pub updated_at: String,
}

impl From<&Plan> for PlanRow {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id.clone(),
            title: plan.title.clone(),
            patient: plan.patient.full_name.clone(),
            status: plan.status.to_string(),
            updated_at: plan.updated_at.clone(),
        }
    }
}

/// Plan page template.
#[derive(Template)]
#[template(path = "plan.html")]
pub struct PlanTemplate {
    pub plan: PlanRow,
    pub summary: String,
    pub correlations: Vec<String>,
    pub supplementation: String,
    pub follow_up: String,
    pub stages: Vec<StageView>,
    pub progress: String,
}

/// Normalized result of one stored stage.
pub struct StageView {
    pub stage: String,
    pub runs: i64,
    pub updated_at: String,
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
}

impl From<&AgentContext> for StageView {
    fn from(ctx: &AgentContext) -> Self {
        let result = stored_result(ctx);
        Self {
            stage: ctx.agent.slug().to_string(),
            runs: ctx.runs,
            updated_at: ctx.updated_at.clone(),
            summary: result.as_ref().map(|r| r.summary.clone()).unwrap_or_default(),
            key_findings: result.as_ref().map(|r| r.key_findings.clone()).unwrap_or_default(),
            recommendations: result
                .as_ref()
                .map(|r| r.recommendations.clone())
                .unwrap_or_default(),
            risk_factors: result.and_then(|r| r.risk_factors).unwrap_or_default(),
        }
    }
}

/// Render the dashboard page.
pub async fn dashboard_page(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<DashboardTemplate> {
    let pool = state.db.pool();
    let company = company::get_company(pool, auth.company_id()).await?;

    let status_counts = plan::count_plans_by_status(pool, auth.company_id())
        .await?
        .into_iter()
        .map(|(status, count): (PlanStatus, i64)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect();

    let recent_plans = plan::list_plans(pool, auth.company_id(), None)
        .await?
        .iter()
        .take(RECENT_PLANS)
        .map(PlanRow::from)
        .collect();

    let material_count = material::count_materials(pool, auth.company_id()).await?;

    Ok(DashboardTemplate {
        company_name: company.name,
        user_name: auth.0.name.clone(),
        status_counts,
        recent_plans,
        material_count,
        analyzer: state.analyzer.name().to_string(),
    })
}

/// Render one plan with its generated content and stage results.
pub async fn plan_page(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<PlanTemplate> {
    let pool = state.db.pool();
    let found = plan::get_plan(pool, auth.company_id(), &id).await?;
    let contexts = agent_context::list_contexts(pool, auth.company_id(), &id).await?;

    let progress = match state.progress.get(&id) {
        Some(p) if p.running => format!("{} running, {}%", p.stage.slug(), p.percent),
        Some(p) => format!("{} finished, {}%", p.stage.slug(), p.percent),
        None => "No analysis run yet".to_string(),
    };

    Ok(PlanTemplate {
        plan: PlanRow::from(&found),
        summary: found.content.summary.clone().unwrap_or_default(),
        correlations: found.content.correlations.clone(),
        supplementation: found.content.supplementation.clone().unwrap_or_default(),
        follow_up: found.content.follow_up.clone().unwrap_or_default(),
        stages: contexts.iter().map(StageView::from).collect(),
        progress,
    })
}
