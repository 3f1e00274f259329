//! Multi-stage plan analysis: analyzer selection, input assembly, result
//! caching and write-back, and per-plan progress tracking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use analysis_core::{hash_input, AnalysisError, AnalysisInput, AnalysisResult, Analyzer, PatientInfo};
use database::{agent_context, plan, AgentContext, AgentKind, ExamResult, Plan};
use llm_analyzer::{LlmAnalyzer, LlmAnalyzerConfig};
use mock_analyzer::MockAnalyzer;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::AppEnv;
use crate::error::Result;
use crate::state::AppState;

/// Pick the analyzer for this process.
///
/// The hosted model is only used in production with a real credential;
/// everything else gets the deterministic mock.
pub fn select_analyzer(
    app_env: AppEnv,
    llm_config: std::result::Result<LlmAnalyzerConfig, AnalysisError>,
) -> Arc<dyn Analyzer> {
    if !app_env.is_production() {
        info!("Using mock analyzer outside production");
        return Arc::new(MockAnalyzer::default());
    }

    match llm_config {
        Ok(config) if config.has_valid_credential() => match LlmAnalyzer::new(config) {
            Ok(analyzer) => Arc::new(analyzer),
            Err(e) => {
                warn!("Hosted analyzer unavailable, using mock: {}", e);
                Arc::new(MockAnalyzer::default())
            }
        },
        Ok(_) => {
            warn!("LLM_API_KEY looks like a placeholder, using mock analyzer");
            Arc::new(MockAnalyzer::default())
        }
        Err(e) => {
            warn!("Hosted analyzer not configured, using mock: {}", e);
            Arc::new(MockAnalyzer::default())
        }
    }
}

/// Progress of the most recent stage run of one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageProgress {
    pub stage: AgentKind,
    pub percent: u8,
    pub running: bool,
    #[serde(skip)]
    finished_at: Option<Instant>,
}

impl StageProgress {
    fn running(stage: AgentKind) -> Self {
        Self {
            stage,
            percent: 0,
            running: true,
            finished_at: None,
        }
    }
}

/// How long a finished stage stays available for polling.
pub const FINISHED_RETENTION: Duration = Duration::from_secs(15 * 60);

/// Last reported progress per plan, shared by every request.
///
/// Finished entries are dropped once they are older than the retention
/// window; running entries are kept until their stage finishes.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    plans: Arc<Mutex<HashMap<String, StageProgress>>>,
    retention: Duration,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::with_retention(FINISHED_RETENTION)
    }
}

impl ProgressTracker {
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            plans: Arc::new(Mutex::new(HashMap::new())),
            retention,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StageProgress>> {
        // A panic elsewhere cannot leave a progress map half-written.
        self.plans.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_expired(&self, plans: &mut HashMap<String, StageProgress>) {
        let retention = self.retention;
        plans.retain(|_, progress| {
            progress
                .finished_at
                .map_or(true, |finished| finished.elapsed() < retention)
        });
    }

    pub fn start(&self, plan_id: &str, stage: AgentKind) {
        let mut plans = self.lock();
        self.evict_expired(&mut plans);
        plans.insert(plan_id.to_string(), StageProgress::running(stage));
    }

    /// Record a checkpoint. Values never go backwards within a stage.
    pub fn update(&self, plan_id: &str, stage: AgentKind, percent: u8) {
        let mut plans = self.lock();
        let entry = plans
            .entry(plan_id.to_string())
            .or_insert_with(|| StageProgress::running(stage));
        if entry.stage != stage {
            *entry = StageProgress::running(stage);
        }
        entry.percent = entry.percent.max(percent.min(100));
    }

    pub fn finish(&self, plan_id: &str, stage: AgentKind) {
        let mut plans = self.lock();
        self.evict_expired(&mut plans);
        plans.insert(
            plan_id.to_string(),
            StageProgress {
                stage,
                percent: 100,
                running: false,
                finished_at: Some(Instant::now()),
            },
        );
    }

    pub fn get(&self, plan_id: &str) -> Option<StageProgress> {
        let mut plans = self.lock();
        self.evict_expired(&mut plans);
        plans.get(plan_id).cloned()
    }

    /// Number of plans currently tracked.
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }
}

/// Outcome of running one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub stage: AgentKind,
    pub result: AnalysisResult,
    /// The stored result was reused without calling the analyzer.
    pub cached: bool,
    /// The analyzer failed and `result` is the generic fallback. Nothing was stored.
    pub fallback: bool,
    pub runs: i64,
    pub analyzer: String,
}

/// Run one pipeline stage for a plan.
///
/// The previous stage's stored result feeds this one. When the stage already
/// has a result computed from the same input it is returned as is unless
/// `force` is set. A failed analysis answers with the fallback result but
/// leaves the stored context and the plan content as they were.
pub async fn run_stage(
    state: &AppState,
    company_id: &str,
    plan_id: &str,
    stage: AgentKind,
    force: bool,
) -> Result<StageOutcome> {
    let pool = state.db.pool();
    let plan = plan::get_plan(pool, company_id, plan_id).await?;

    let previous = match stage.previous() {
        Some(prev) => agent_context::get_context(pool, company_id, plan_id, prev)
            .await?
            .and_then(|ctx| stored_result(&ctx)),
        None => None,
    };

    let input = build_input(&plan, stage, previous.as_ref());
    let analyzer_name = state.analyzer.name().to_string();
    let fingerprint = format!("{}:{}", analyzer_name, hash_input(&input));

    let existing = agent_context::get_context(pool, company_id, plan_id, stage).await?;
    let stored_runs = existing.as_ref().map_or(0, |ctx| ctx.runs);

    if !force {
        if let Some(ctx) = &existing {
            if ctx.input_fingerprint.as_deref() == Some(fingerprint.as_str()) {
                if let Some(result) = stored_result(ctx) {
                    info!(plan_id = %plan_id, stage = %stage, "Reusing stored analysis");
                    state.progress.finish(plan_id, stage);
                    return Ok(StageOutcome {
                        stage,
                        result,
                        cached: true,
                        fallback: false,
                        runs: ctx.runs,
                        analyzer: analyzer_name,
                    });
                }
            }
        }
    }

    info!(plan_id = %plan_id, stage = %stage, analyzer = %analyzer_name, "Running analysis stage");
    state.progress.start(plan_id, stage);

    let tracker = state.progress.clone();
    let tracked_plan = plan_id.to_string();
    let on_progress = move |percent: u8| tracker.update(&tracked_plan, stage, percent);

    let result = match state.analyzer.try_analyze(&input, &on_progress).await {
        Ok(result) => result,
        Err(e) => {
            warn!(
                plan_id = %plan_id,
                stage = %stage,
                error_class = e.class(),
                "Analysis failed, answering with fallback: {}",
                e
            );
            state.progress.finish(plan_id, stage);
            return Ok(StageOutcome {
                stage,
                result: AnalysisResult::fallback(&e),
                cached: false,
                fallback: true,
                runs: stored_runs,
                analyzer: analyzer_name,
            });
        }
    };

    let context_state = json!({
        "result": result,
        "analyzer": analyzer_name,
        "mock": state.analyzer.is_mock(),
        "input": input,
    });
    let ctx = agent_context::upsert_context(
        pool,
        company_id,
        plan_id,
        stage,
        &context_state,
        Some(fingerprint.as_str()),
    )
    .await?;

    write_back(state, company_id, plan_id, stage, &result).await?;
    state.progress.finish(plan_id, stage);

    Ok(StageOutcome {
        stage,
        result,
        cached: false,
        fallback: false,
        runs: ctx.runs,
        analyzer: analyzer_name,
    })
}

/// The analysis result stored in a context, if it holds one.
pub fn stored_result(ctx: &AgentContext) -> Option<AnalysisResult> {
    ctx.state
        .get("result")
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// Copy a stage result into the plan's content fields owned by that stage.
async fn write_back(
    state: &AppState,
    company_id: &str,
    plan_id: &str,
    stage: AgentKind,
    result: &AnalysisResult,
) -> Result<()> {
    match stage {
        AgentKind::ExamAnalysis => {
            plan::update_content(state.db.pool(), company_id, plan_id, |content| {
                content.summary = Some(result.summary.clone());
                content.correlations = result.key_findings.clone();
            })
            .await?;
        }
        AgentKind::PlanGeneration => {
            plan::update_content(state.db.pool(), company_id, plan_id, |content| {
                content.summary = Some(result.summary.clone());
                if !result.recommendations.is_empty() {
                    content.supplementation = Some(result.recommendations.join("\n"));
                }
                if let Some(risks) = result.risk_factors.as_ref().filter(|r| !r.is_empty()) {
                    content.follow_up = Some(risks.join("\n"));
                }
            })
            .await?;
        }
        AgentKind::TcmAnalysis | AgentKind::IfmAnalysis => {}
    }

    Ok(())
}

/// Assemble the analyzer input for one stage of a plan.
pub fn build_input(
    plan: &Plan,
    stage: AgentKind,
    previous: Option<&AnalysisResult>,
) -> AnalysisInput {
    let patient = &plan.patient;
    let patient_info = PatientInfo {
        full_name: non_empty(&patient.full_name),
        birth_date: patient.birth_date.clone(),
        gender: patient.gender.clone(),
        occupation: patient.occupation.clone(),
        main_complaint: patient.main_complaint.clone(),
    };

    let mut sections = Vec::new();
    if let Some(data) = stage_data(plan, stage) {
        sections.push(data);
    }
    if let Some(prev) = previous {
        let mut text = prev.summary.clone();
        for finding in &prev.key_findings {
            text.push_str("\n- ");
            text.push_str(finding);
        }
        sections.push(text);
    }

    let recommendations = previous
        .map(|prev| prev.recommendations.join("\n"))
        .filter(|text| !text.is_empty());

    let file_names = plan
        .exams
        .iter()
        .flat_map(|exam| exam.files.iter().map(|file| file.name.clone()))
        .collect();

    AnalysisInput {
        findings: (!sections.is_empty()).then(|| sections.join("\n\n")),
        recommendations,
        file_names,
        patient_info: Some(patient_info),
    }
}

fn stage_data(plan: &Plan, stage: AgentKind) -> Option<String> {
    let lines: Vec<String> = match stage {
        AgentKind::ExamAnalysis => plan
            .exams
            .iter()
            .map(|exam| {
                let mut line = exam.name.clone();
                if let Some(date) = &exam.date {
                    line.push_str(&format!(" ({date})"));
                }
                if let Some(result) = &exam.result {
                    line.push_str(": ");
                    line.push_str(&describe_result(result));
                }
                if let Some(observation) = exam.observation.as_deref().and_then(non_empty) {
                    line.push_str(&format!(". {observation}"));
                }
                line
            })
            .collect(),
        AgentKind::TcmAnalysis => {
            let tcm = &plan.tcm;
            let mut lines = Vec::new();
            if let Some(facial) = tcm.facial.as_deref().and_then(non_empty) {
                lines.push(format!("Facial: {facial}"));
            }
            if let Some(tongue) = &tcm.tongue {
                let parts: Vec<&str> = [&tongue.color, &tongue.coating, &tongue.shape, &tongue.moisture]
                    .into_iter()
                    .filter_map(|part| part.as_deref())
                    .collect();
                if !parts.is_empty() {
                    lines.push(format!("Tongue: {}", parts.join(", ")));
                }
            }
            for reading in &tcm.pulse {
                lines.push(format!("Pulse {}: {}", reading.position, reading.quality));
            }
            if let Some(energetic) = tcm.energetic.as_deref().and_then(non_empty) {
                lines.push(format!("Energetic: {energetic}"));
            }
            lines
        }
        AgentKind::IfmAnalysis => plan
            .ifm_matrix
            .categories()
            .into_iter()
            .filter(|(_, category)| !category.is_empty())
            .map(|(label, category)| {
                format!(
                    "{label}: antecedents {}; triggers {}; mediators {}",
                    category.antecedents, category.triggers, category.mediators
                )
            })
            .collect(),
        AgentKind::PlanGeneration => {
            let mut lines = Vec::new();
            if let Some(lifestyle) = &plan.patient.lifestyle {
                for (label, value) in [
                    ("Diet", &lifestyle.diet),
                    ("Sleep", &lifestyle.sleep),
                    ("Physical activity", &lifestyle.physical_activity),
                    ("Stress", &lifestyle.stress_level),
                ] {
                    if let Some(value) = value.as_deref().and_then(non_empty) {
                        lines.push(format!("{label}: {value}"));
                    }
                }
            }
            for event in &plan.timeline {
                lines.push(format!("{} - {}", event.date, event.title));
            }
            lines
        }
    };

    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn describe_result(result: &ExamResult) -> String {
    match result {
        ExamResult::Numeric {
            value,
            unit,
            reference_range,
        } => {
            let mut text = value.to_string();
            if let Some(unit) = unit {
                text.push(' ');
                text.push_str(unit);
            }
            if let Some(range) = reference_range {
                text.push_str(&format!(" (reference {range})"));
            }
            text
        }
        ExamResult::Text { text } => text.clone(),
        ExamResult::Panel { markers } => markers
            .iter()
            .map(|m| {
                let mut text = format!("{} {}", m.name, m.value);
                if let Some(unit) = &m.unit {
                    text.push(' ');
                    text.push_str(unit);
                }
                if let Some(flag) = &m.flag {
                    text.push_str(&format!(" [{flag}]"));
                }
                text
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
