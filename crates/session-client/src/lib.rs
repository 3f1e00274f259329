//! Client-side session handling for the clinical plans API.
//!
//! [`SessionStore`] holds the bearer token and user profile, persisted
//! through a [`SessionPersistence`]. [`RouteGuard`] decides whether a page
//! renders or redirects; [`GuardDriver`] runs its validation calls.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use session_client::{
//!     ApiClient, FileSessionPersistence, GuardDriver, GuardPaths, RouteKind, SessionConfig,
//!     SessionStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::from_env();
//!     let store = Arc::new(SessionStore::new(
//!         ApiClient::new(&config.api_url)?,
//!         Arc::new(FileSessionPersistence::new(&config.session_file)),
//!     ));
//!     store.restore().await?;
//!
//!     let mut driver = GuardDriver::new(
//!         store.clone(),
//!         GuardPaths::default(),
//!         config.validation_delay,
//!         config.max_validation_attempts,
//!     );
//!     let action = driver.navigate(RouteKind::Protected).await;
//!     println!("{:?}", action);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod driver;
mod error;
mod guard;
mod persistence;
mod store;
mod types;

pub use client::ApiClient;
pub use config::{SessionConfig, DEFAULT_API_URL};
pub use driver::GuardDriver;
pub use error::{Result, SessionError};
pub use guard::{GuardAction, GuardPaths, GuardState, RouteGuard, RouteKind, ValidationOutcome};
pub use persistence::{FileSessionPersistence, MemorySessionPersistence, SessionPersistence};
pub use store::SessionStore;
pub use types::{ForgotPasswordResponse, RegisterRequest, StoredSession, UserProfile};
