//! Per-stage analysis context storage.
//!
//! One row per (agent, plan). Writes go through a single upsert so concurrent
//! writers converge on that row instead of inserting duplicates.

use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{AgentContext, AgentKind};

const CONTEXT_COLUMNS: &str =
    "id, agent, plan_id, company_id, state, input_fingerprint, runs, created_at, updated_at";

/// Create or replace the context of one stage for one plan.
pub async fn upsert_context(
    pool: &SqlitePool,
    company_id: &str,
    plan_id: &str,
    agent: AgentKind,
    state: &serde_json::Value,
    input_fingerprint: Option<&str>,
) -> Result<AgentContext> {
    let id = uuid::Uuid::new_v4().to_string();

    let context = sqlx::query_as::<_, AgentContext>(&format!(
        r#"
        INSERT INTO agent_contexts (id, agent, plan_id, company_id, state, input_fingerprint)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(agent, plan_id) DO UPDATE SET
            state = excluded.state,
            input_fingerprint = excluded.input_fingerprint,
            runs = agent_contexts.runs + 1,
            updated_at = datetime('now')
        RETURNING {CONTEXT_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(agent.as_str())
    .bind(plan_id)
    .bind(company_id)
    .bind(Json(state))
    .bind(input_fingerprint)
    .fetch_one(pool)
    .await?;

    tracing::debug!(
        plan_id = %plan_id,
        agent = %agent,
        runs = context.runs,
        "Agent context stored"
    );

    Ok(context)
}

/// Get the context of one stage for one plan.
pub async fn get_context(
    pool: &SqlitePool,
    company_id: &str,
    plan_id: &str,
    agent: AgentKind,
) -> Result<Option<AgentContext>> {
    let context = sqlx::query_as::<_, AgentContext>(&format!(
        "SELECT {CONTEXT_COLUMNS} FROM agent_contexts \
         WHERE plan_id = ? AND agent = ? AND company_id = ?"
    ))
    .bind(plan_id)
    .bind(agent.as_str())
    .bind(company_id)
    .fetch_optional(pool)
    .await?;

    Ok(context)
}

/// List all stage contexts of a plan.
pub async fn list_contexts(
    pool: &SqlitePool,
    company_id: &str,
    plan_id: &str,
) -> Result<Vec<AgentContext>> {
    let contexts = sqlx::query_as::<_, AgentContext>(&format!(
        "SELECT {CONTEXT_COLUMNS} FROM agent_contexts \
         WHERE plan_id = ? AND company_id = ? ORDER BY created_at"
    ))
    .bind(plan_id)
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(contexts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::{create_company, NewCompany};
    use crate::models::{PatientData, Profession, Role};
    use crate::plan::{create_plan, NewPlan};
    use crate::user::{create_user, NewUser};
    use crate::Database;
    use serde_json::json;

    async fn setup(db: &Database) -> (String, String) {
        let company = create_company(
            db.pool(),
            &NewCompany {
                name: "Clinic".to_string(),
                email_domain: None,
            },
        )
        .await
        .unwrap();
        let user = create_user(
            db.pool(),
            &NewUser {
                company_id: company.id.clone(),
                name: "Dr. Lima".to_string(),
                email: "lima@clinic.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Admin,
                profession: Profession::Physician,
                registration_number: None,
            },
        )
        .await
        .unwrap();
        let plan = create_plan(
            db.pool(),
            &NewPlan {
                company_id: company.id.clone(),
                created_by: user.id,
                title: "Plan".to_string(),
                patient: PatientData::default(),
            },
        )
        .await
        .unwrap();
        (company.id, plan.id)
    }

    #[tokio::test]
    async fn test_upsert_replaces_state() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let (company_id, plan_id) = setup(&db).await;

        let first = upsert_context(
            db.pool(),
            &company_id,
            &plan_id,
            AgentKind::ExamAnalysis,
            &json!({"summary": "first"}),
            Some("fp-1"),
        )
        .await
        .unwrap();
        assert_eq!(first.runs, 1);

        let second = upsert_context(
            db.pool(),
            &company_id,
            &plan_id,
            AgentKind::ExamAnalysis,
            &json!({"summary": "second"}),
            Some("fp-2"),
        )
        .await
        .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.runs, 2);
        assert_eq!(second.state["summary"], "second");
        assert_eq!(second.input_fingerprint.as_deref(), Some("fp-2"));

        upsert_context(
            db.pool(),
            &company_id,
            &plan_id,
            AgentKind::TcmAnalysis,
            &json!({}),
            None,
        )
        .await
        .unwrap();

        let contexts = list_contexts(db.pool(), &company_id, &plan_id).await.unwrap();
        assert_eq!(contexts.len(), 2);

        let missing = get_context(db.pool(), &company_id, &plan_id, AgentKind::PlanGeneration)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_keep_one_row() {
        // File-backed database so every pooled connection sees the same data
        // and writers wait on each other through the busy timeout.
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("contexts.db").display());
        let db = Database::connect_with_pool_size(&url, 8).await.unwrap();
        db.migrate().await.unwrap();
        let (company_id, plan_id) = setup(&db).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = db.pool().clone();
            let company_id = company_id.clone();
            let plan_id = plan_id.clone();
            handles.push(tokio::spawn(async move {
                upsert_context(
                    &pool,
                    &company_id,
                    &plan_id,
                    AgentKind::IfmAnalysis,
                    &json!({ "writer": i }),
                    None,
                )
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let contexts = list_contexts(db.pool(), &company_id, &plan_id).await.unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].runs, 8);
    }
}
