//! User CRUD operations.
//!
//! Lookups that come from an authenticated request are scoped by company; the
//! login and token paths look users up globally by e-mail or id.

use std::time::Duration;

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{map_unique, DatabaseError, Result};
use crate::models::{Profession, Role, User};
use crate::validation::{validate_email, validate_title};

const USER_COLUMNS: &str = "id, company_id, name, email, password_hash, role, profession, \
     registration_number, created_at, updated_at";

/// Fields for a new user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub company_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profession: Profession,
    pub registration_number: Option<String>,
}

/// Editable profile fields. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub profession: Option<Profession>,
    pub registration_number: Option<String>,
    pub role: Option<Role>,
}

/// Create a new user.
pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> Result<User> {
    let id = {
        let mut conn = pool.acquire().await?;
        insert_user(&mut *conn, user).await?
    };
    get_user_by_id(pool, &id).await
}

pub(crate) async fn insert_user(conn: &mut SqliteConnection, user: &NewUser) -> Result<String> {
    validate_title("name", &user.name)?;
    validate_email(&user.email)?;
    let email = user.email.trim().to_lowercase();
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO users (id, company_id, name, email, password_hash, role, profession, registration_number)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&user.company_id)
    .bind(user.name.trim())
    .bind(&email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.profession.as_str())
    .bind(&user.registration_number)
    .execute(conn)
    .await
    .map_err(map_unique("User", &email))?;

    Ok(id)
}

/// Get a user by ID, regardless of company. Used for token validation.
pub async fn get_user_by_id(pool: &SqlitePool, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Get a user by ID within a company.
pub async fn get_user(pool: &SqlitePool, company_id: &str, id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND company_id = ?"
    ))
    .bind(id)
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Get a user by login e-mail.
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<User> {
    let email = email.trim().to_lowercase();
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(&email)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: email.clone(),
    })
}

/// List users of a company.
pub async fn list_users(pool: &SqlitePool, company_id: &str) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE company_id = ? ORDER BY name"
    ))
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Update profile fields of a user within a company.
pub async fn update_user(
    pool: &SqlitePool,
    company_id: &str,
    id: &str,
    update: &UserUpdate,
) -> Result<User> {
    let current = get_user(pool, company_id, id).await?;

    let name = match &update.name {
        Some(name) => {
            validate_title("name", name)?;
            name.trim().to_string()
        }
        None => current.name,
    };
    let profession = update.profession.unwrap_or(current.profession);
    let role = update.role.unwrap_or(current.role);
    let registration_number = update
        .registration_number
        .clone()
        .or(current.registration_number);

    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, profession = ?, role = ?, registration_number = ?, updated_at = datetime('now')
        WHERE id = ? AND company_id = ?
        "#,
    )
    .bind(&name)
    .bind(profession.as_str())
    .bind(role.as_str())
    .bind(&registration_number)
    .bind(id)
    .bind(company_id)
    .execute(pool)
    .await?;

    get_user(pool, company_id, id).await
}

/// Replace a user's password hash and invalidate any pending reset token.
pub async fn set_password_hash(pool: &SqlitePool, id: &str, password_hash: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?, reset_token_hash = NULL, reset_token_expires_at = NULL,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(password_hash)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Store the hash of a password-reset token valid for `ttl`.
pub async fn set_reset_token(
    pool: &SqlitePool,
    id: &str,
    token_hash: &str,
    ttl: Duration,
) -> Result<()> {
    let modifier = format!("+{} seconds", ttl.as_secs());
    sqlx::query(
        r#"
        UPDATE users
        SET reset_token_hash = ?, reset_token_expires_at = datetime('now', ?)
        WHERE id = ?
        "#,
    )
    .bind(token_hash)
    .bind(modifier)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find the user owning an unexpired reset token hash.
pub async fn find_by_reset_token(pool: &SqlitePool, token_hash: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE reset_token_hash = ? AND reset_token_expires_at > datetime('now')"
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Delete a user of a company.
pub async fn delete_user(pool: &SqlitePool, company_id: &str, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM users
        WHERE id = ? AND company_id = ?
        "#,
    )
    .bind(id)
    .bind(company_id)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::InUse {
                    entity: "User",
                    id: id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Count users of a company.
pub async fn count_users(pool: &SqlitePool, company_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM users WHERE company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
