//! Plan persistence.
//!
//! Nested sub-records are whole JSON documents; an update replaces the
//! documents it carries and leaves the others, and the status, untouched.
//! Every read-modify-write of those documents runs inside one
//! `BEGIN IMMEDIATE` transaction.

use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{
    Exam, FileRef, IfmMatrix, PatientData, Plan, PlanContent, PlanStatus, TcmObservations,
    TimelineEvent,
};
use crate::validation::validate_title;

const PLAN_COLUMNS: &str = "id, company_id, created_by, title, status, patient, exams, tcm, \
     timeline, ifm_matrix, content, created_at, updated_at";

/// Fields for a new plan. Plans always start as `DRAFT`.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub company_id: String,
    pub created_by: String,
    pub title: String,
    pub patient: PatientData,
}

/// Document replacements for a plan. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct PlanUpdate {
    pub title: Option<String>,
    pub patient: Option<PatientData>,
    pub exams: Option<Vec<Exam>>,
    pub tcm: Option<TcmObservations>,
    pub timeline: Option<Vec<TimelineEvent>>,
    pub ifm_matrix: Option<IfmMatrix>,
    pub content: Option<PlanContent>,
}

/// Create a plan in `DRAFT` status.
pub async fn create_plan(pool: &SqlitePool, plan: &NewPlan) -> Result<Plan> {
    validate_title("title", &plan.title)?;
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO plans (id, company_id, created_by, title, status, patient)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&plan.company_id)
    .bind(&plan.created_by)
    .bind(plan.title.trim())
    .bind(PlanStatus::Draft.as_str())
    .bind(Json(&plan.patient))
    .execute(pool)
    .await?;

    tracing::debug!(plan_id = %id, company_id = %plan.company_id, "Plan created");

    get_plan(pool, &plan.company_id, &id).await
}

/// Get a plan within a company.
pub async fn get_plan(pool: &SqlitePool, company_id: &str, id: &str) -> Result<Plan> {
    sqlx::query_as::<_, Plan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE id = ? AND company_id = ?"
    ))
    .bind(id)
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Plan",
        id: id.to_string(),
    })
}

/// List plans of a company, newest first, optionally filtered by status.
pub async fn list_plans(
    pool: &SqlitePool,
    company_id: &str,
    status: Option<PlanStatus>,
) -> Result<Vec<Plan>> {
    let plans = match status {
        Some(status) => {
            sqlx::query_as::<_, Plan>(&format!(
                "SELECT {PLAN_COLUMNS} FROM plans WHERE company_id = ? AND status = ? \
                 ORDER BY updated_at DESC, created_at DESC"
            ))
            .bind(company_id)
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Plan>(&format!(
                "SELECT {PLAN_COLUMNS} FROM plans WHERE company_id = ? \
                 ORDER BY updated_at DESC, created_at DESC"
            ))
            .bind(company_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(plans)
}

/// Replace the documents carried by `update`. Never touches the status.
pub async fn update_plan(
    pool: &SqlitePool,
    company_id: &str,
    id: &str,
    update: PlanUpdate,
) -> Result<Plan> {
    if let Some(title) = &update.title {
        validate_title("title", title)?;
    }

    modify_plan(pool, company_id, id, |plan| {
        if let Some(title) = update.title {
            plan.title = title.trim().to_string();
        }
        if let Some(patient) = update.patient {
            plan.patient = patient;
        }
        if let Some(exams) = update.exams {
            plan.exams = exams;
        }
        if let Some(tcm) = update.tcm {
            plan.tcm = tcm;
        }
        if let Some(timeline) = update.timeline {
            plan.timeline = timeline;
        }
        if let Some(ifm_matrix) = update.ifm_matrix {
            plan.ifm_matrix = ifm_matrix;
        }
        if let Some(content) = update.content {
            plan.content = content;
        }
        Ok(())
    })
    .await
}

/// Change fields of the generated content document.
///
/// `apply` sees the content as currently stored, so fields it leaves alone
/// keep whatever was saved in the meantime.
pub async fn update_content<F>(pool: &SqlitePool, company_id: &str, id: &str, apply: F) -> Result<Plan>
where
    F: FnOnce(&mut PlanContent),
{
    modify_plan(pool, company_id, id, |plan| {
        apply(&mut plan.content);
        Ok(())
    })
    .await
}

/// Move a plan to another status.
///
/// Asking for the current status is a no-op; illegal moves are rejected with
/// [`DatabaseError::InvalidTransition`].
pub async fn transition_status(
    pool: &SqlitePool,
    company_id: &str,
    id: &str,
    next: PlanStatus,
) -> Result<Plan> {
    let plan = get_plan(pool, company_id, id).await?;

    if plan.status == next {
        return Ok(plan);
    }

    if !plan.status.can_transition_to(next) {
        return Err(DatabaseError::InvalidTransition {
            entity: "Plan",
            from: plan.status.to_string(),
            to: next.to_string(),
        });
    }

    // Guard on the old status so a concurrent transition cannot be overwritten.
    let result = sqlx::query(
        r#"
        UPDATE plans
        SET status = ?, updated_at = datetime('now')
        WHERE id = ? AND company_id = ? AND status = ?
        "#,
    )
    .bind(next.as_str())
    .bind(id)
    .bind(company_id)
    .bind(plan.status.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let current = get_plan(pool, company_id, id).await?;
        return Err(DatabaseError::InvalidTransition {
            entity: "Plan",
            from: current.status.to_string(),
            to: next.to_string(),
        });
    }

    tracing::info!(plan_id = %id, from = %plan.status, to = %next, "Plan status changed");

    get_plan(pool, company_id, id).await
}

/// Append an uploaded file to one of the plan's exams.
pub async fn attach_exam_file(
    pool: &SqlitePool,
    company_id: &str,
    plan_id: &str,
    exam_id: &str,
    file: FileRef,
) -> Result<Plan> {
    modify_plan(pool, company_id, plan_id, |plan| {
        let exam = plan
            .exams
            .iter_mut()
            .find(|exam| exam.id == exam_id)
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "Exam",
                id: exam_id.to_string(),
            })?;
        exam.files.push(file);
        Ok(())
    })
    .await
}

/// Remove a file reference from whichever exam holds it.
///
/// Returns `true` when a reference was removed.
pub async fn detach_file(
    pool: &SqlitePool,
    company_id: &str,
    object_name: &str,
) -> Result<bool> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let plans = sqlx::query_as::<_, Plan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE company_id = ?"
    ))
    .bind(company_id)
    .fetch_all(&mut *tx)
    .await?;

    for mut plan in plans {
        let mut removed = false;
        for exam in plan.exams.iter_mut() {
            let before = exam.files.len();
            exam.files.retain(|file| file.object_name != object_name);
            removed |= exam.files.len() != before;
        }
        if removed {
            write_documents(&mut *tx, &plan).await?;
            tx.commit().await?;
            return Ok(true);
        }
    }

    Ok(false)
}

/// Whether any plan of the company references `object_name` from an exam.
pub async fn has_exam_file(pool: &SqlitePool, company_id: &str, object_name: &str) -> Result<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1
            FROM plans, json_each(plans.exams) AS exam, json_each(exam.value, '$.files') AS file
            WHERE plans.company_id = ? AND json_extract(file.value, '$.object_name') = ?
        )
        "#,
    )
    .bind(company_id)
    .bind(object_name)
    .fetch_one(pool)
    .await?;

    Ok(found)
}

/// Count plans of a company grouped by status.
pub async fn count_plans_by_status(
    pool: &SqlitePool,
    company_id: &str,
) -> Result<Vec<(PlanStatus, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT status, COUNT(*) as count
        FROM plans
        WHERE company_id = ?
        GROUP BY status
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    let mut counts: Vec<(PlanStatus, i64)> = PlanStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for (status, count) in rows {
        if let Ok(status) = status.parse::<PlanStatus>() {
            if let Some(entry) = counts.iter_mut().find(|(s, _)| *s == status) {
                entry.1 = count;
            }
        }
    }

    Ok(counts)
}

/// Read, change and write back one plan while holding the database write lock.
async fn modify_plan<F>(pool: &SqlitePool, company_id: &str, id: &str, apply: F) -> Result<Plan>
where
    F: FnOnce(&mut Plan) -> Result<()>,
{
    // IMMEDIATE takes the write lock before the read, so two writers serialize
    // instead of both working from the same snapshot.
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let mut plan = fetch_plan(&mut *tx, company_id, id).await?;
    apply(&mut plan)?;
    write_documents(&mut *tx, &plan).await?;
    let plan = fetch_plan(&mut *tx, company_id, id).await?;

    tx.commit().await?;
    Ok(plan)
}

async fn fetch_plan(conn: &mut SqliteConnection, company_id: &str, id: &str) -> Result<Plan> {
    sqlx::query_as::<_, Plan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE id = ? AND company_id = ?"
    ))
    .bind(id)
    .bind(company_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Plan",
        id: id.to_string(),
    })
}

async fn write_documents(conn: &mut SqliteConnection, plan: &Plan) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE plans
        SET title = ?, patient = ?, exams = ?, tcm = ?, timeline = ?, ifm_matrix = ?, content = ?,
            updated_at = datetime('now')
        WHERE id = ? AND company_id = ?
        "#,
    )
    .bind(&plan.title)
    .bind(Json(&plan.patient))
    .bind(Json(&plan.exams))
    .bind(Json(&plan.tcm))
    .bind(Json(&plan.timeline))
    .bind(Json(&plan.ifm_matrix))
    .bind(Json(&plan.content))
    .bind(&plan.id)
    .bind(&plan.company_id)
    .execute(conn)
    .await?;

    Ok(())
}
