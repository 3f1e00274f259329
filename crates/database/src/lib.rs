//! SQLite persistence layer for clinical plans.
//!
//! This crate provides async database operations for companies, users, plans,
//! educational materials and analysis-stage contexts using SQLx with SQLite.
//! Every tenant-owned operation takes the caller's `company_id`.
//!
//! # Example
//!
//! ```no_run
//! use database::{company, plan, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:plans.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let clinic = company::create_company(
//!         db.pool(),
//!         &company::NewCompany { name: "Clinic".to_string(), email_domain: None },
//!     )
//!     .await?;
//!
//!     let plans = plan::list_plans(db.pool(), &clinic.id, None).await?;
//!     println!("{} plans", plans.len());
//!     Ok(())
//! }
//! ```

pub mod agent_context;
pub mod company;
pub mod error;
pub mod material;
pub mod models;
pub mod plan;
pub mod user;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    AgentContext, AgentKind, Company, Exam, ExamMarker, ExamResult, FamilyHistory, FileRef,
    GestationalHistory, IfmCategory, IfmMatrix, Lifestyle, Material, MaterialCategory,
    MenstrualHistory, NutritionalPlan, PatientData, Plan, PlanContent, PlanStatus,
    ProcessingStatus, Profession, PulsePosition, PulseReading, Role, TcmObservations,
    TimelineEvent, TongueObservation, User,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/plans.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Profession, Role};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn test_company(db: &Database, name: &str) -> Company {
        company::create_company(
            db.pool(),
            &company::NewCompany {
                name: name.to_string(),
                email_domain: None,
            },
        )
        .await
        .unwrap()
    }

    fn new_user(company_id: &str, email: &str) -> user::NewUser {
        user::NewUser {
            company_id: company_id.to_string(),
            name: "Alice".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            profession: Profession::Nutritionist,
            registration_number: None,
        }
    }

    #[tokio::test]
    async fn test_user_crud() {
        let db = test_db().await;
        let clinic = test_company(&db, "Clinic").await;

        // Create
        let created = user::create_user(db.pool(), &new_user(&clinic.id, "Alice@Clinic.com"))
            .await
            .unwrap();
        assert_eq!(created.email, "alice@clinic.com");

        // Read
        let fetched = user::get_user(db.pool(), &clinic.id, &created.id).await.unwrap();
        assert_eq!(fetched.name, "Alice");
        let by_email = user::get_user_by_email(db.pool(), "ALICE@clinic.com").await.unwrap();
        assert_eq!(by_email.id, created.id);

        // Update
        let updated = user::update_user(
            db.pool(),
            &clinic.id,
            &created.id,
            &user::UserUpdate {
                profession: Some(Profession::Physician),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.profession, Profession::Physician);
        assert_eq!(updated.name, "Alice");

        // List
        let users = user::list_users(db.pool(), &clinic.id).await.unwrap();
        assert_eq!(users.len(), 1);

        // Delete
        user::delete_user(db.pool(), &clinic.id, &created.id).await.unwrap();
        let result = user::get_user(db.pool(), &clinic.id, &created.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        let clinic = test_company(&db, "Clinic").await;

        user::create_user(db.pool(), &new_user(&clinic.id, "alice@clinic.com"))
            .await
            .unwrap();
        let result = user::create_user(db.pool(), &new_user(&clinic.id, "ALICE@clinic.com")).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_users_are_tenant_scoped() {
        let db = test_db().await;
        let clinic = test_company(&db, "Clinic").await;
        let other = test_company(&db, "Other").await;

        let alice = user::create_user(db.pool(), &new_user(&clinic.id, "alice@clinic.com"))
            .await
            .unwrap();

        let result = user::get_user(db.pool(), &other.id, &alice.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
        let result = user::delete_user(db.pool(), &other.id, &alice.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
        assert_eq!(user::count_users(db.pool(), &clinic.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reset_token_lifecycle() {
        let db = test_db().await;
        let clinic = test_company(&db, "Clinic").await;
        let alice = user::create_user(db.pool(), &new_user(&clinic.id, "alice@clinic.com"))
            .await
            .unwrap();

        user::set_reset_token(db.pool(), &alice.id, "token-hash", std::time::Duration::from_secs(3600))
            .await
            .unwrap();
        let found = user::find_by_reset_token(db.pool(), "token-hash").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(alice.id.clone()));

        user::set_password_hash(db.pool(), &alice.id, "new-hash").await.unwrap();
        let found = user::find_by_reset_token(db.pool(), "token-hash").await.unwrap();
        assert!(found.is_none());

        let reloaded = user::get_user_by_id(db.pool(), &alice.id).await.unwrap();
        assert_eq!(reloaded.password_hash, "new-hash");
    }
}
