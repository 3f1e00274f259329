//! Company (tenant) operations.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{Company, User};
use crate::user::{self, NewUser};
use crate::validation::{validate_domain, validate_title};

/// Fields for a new company.
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub email_domain: Option<String>,
}

/// Create a company and return it.
pub async fn create_company(pool: &SqlitePool, company: &NewCompany) -> Result<Company> {
    let id = {
        let mut conn = pool.acquire().await?;
        insert_company(&mut *conn, company).await?
    };
    get_company(pool, &id).await
}

/// Create a company together with its first user.
///
/// Both rows are written in one transaction; when the user is rejected the
/// company is not kept. `owner.company_id` is replaced with the new company.
pub async fn create_company_with_owner(
    pool: &SqlitePool,
    company: &NewCompany,
    owner: NewUser,
) -> Result<(Company, User)> {
    let mut tx = pool.begin().await?;

    let company_id = insert_company(&mut *tx, company).await?;
    let owner = NewUser { company_id, ..owner };
    let user_id = user::insert_user(&mut *tx, &owner).await?;

    tx.commit().await?;

    tracing::info!(company_id = %owner.company_id, user_id = %user_id, "Company created with owner");

    let company = get_company(pool, &owner.company_id).await?;
    let user = user::get_user_by_id(pool, &user_id).await?;
    Ok((company, user))
}

async fn insert_company(conn: &mut SqliteConnection, company: &NewCompany) -> Result<String> {
    validate_title("company name", &company.name)?;
    let email_domain = normalize_domain(company.email_domain.as_deref())?;
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO companies (id, name, email_domain)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(company.name.trim())
    .bind(email_domain)
    .execute(conn)
    .await?;

    Ok(id)
}

/// Get a company by ID.
pub async fn get_company(pool: &SqlitePool, id: &str) -> Result<Company> {
    sqlx::query_as::<_, Company>(
        r#"
        SELECT id, name, email_domain, created_at, updated_at
        FROM companies
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Company",
        id: id.to_string(),
    })
}

/// Update a company's name and e-mail domain.
pub async fn update_company(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    email_domain: Option<&str>,
) -> Result<Company> {
    validate_title("company name", name)?;
    let email_domain = normalize_domain(email_domain)?;

    let result = sqlx::query(
        r#"
        UPDATE companies
        SET name = ?, email_domain = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(name.trim())
    .bind(email_domain)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Company",
            id: id.to_string(),
        });
    }

    get_company(pool, id).await
}

fn normalize_domain(domain: Option<&str>) -> Result<Option<String>> {
    match domain.map(str::trim).filter(|d| !d.is_empty()) {
        Some(domain) => {
            let domain = domain.trim_start_matches('@').to_lowercase();
            validate_domain(&domain)?;
            Ok(Some(domain))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_company_create_and_update() {
        let db = test_db().await;

        let company = create_company(
            db.pool(),
            &NewCompany {
                name: " Clinic One ".to_string(),
                email_domain: Some("@Clinic.COM".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(company.name, "Clinic One");
        assert_eq!(company.email_domain.as_deref(), Some("clinic.com"));

        let updated = update_company(db.pool(), &company.id, "Clinic Two", None)
            .await
            .unwrap();
        assert_eq!(updated.name, "Clinic Two");
        assert!(updated.email_domain.is_none());
    }

    #[tokio::test]
    async fn test_company_with_owner_is_all_or_nothing() {
        use crate::models::{Profession, Role};

        let db = test_db().await;
        let owner = |email: &str| NewUser {
            company_id: String::new(),
            name: "Dr. Lima".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Admin,
            profession: Profession::Physician,
            registration_number: None,
        };
        let clinic = || NewCompany {
            name: "Clinic".to_string(),
            email_domain: None,
        };

        let (company, user) = create_company_with_owner(db.pool(), &clinic(), owner("lima@clinic.com"))
            .await
            .unwrap();
        assert_eq!(user.company_id, company.id);
        assert!(user.is_admin());

        let duplicate = create_company_with_owner(db.pool(), &clinic(), owner("LIMA@clinic.com")).await;
        assert!(matches!(duplicate, Err(DatabaseError::AlreadyExists { entity: "User", .. })));

        let invalid = create_company_with_owner(db.pool(), &clinic(), owner("not-an-email")).await;
        assert!(matches!(invalid, Err(DatabaseError::Validation(_))));

        let companies: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(companies, 1);
    }

    #[tokio::test]
    async fn test_company_rejects_bad_domain() {
        let db = test_db().await;

        let result = create_company(
            db.pool(),
            &NewCompany {
                name: "Clinic".to_string(),
                email_domain: Some("localhost".to_string()),
            },
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_company_not_found() {
        let db = test_db().await;
        let result = get_company(db.pool(), "missing").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
