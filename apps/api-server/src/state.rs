//! Application state - shared across all handlers.

use std::collections::HashSet;
use std::sync::Arc;

use blogicum_core::ports::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository, ROLE_STAFF,
    ROLE_USER, UserRepository,
};
use blogicum_infra::InMemoryStore;

#[cfg(feature = "postgres")]
use blogicum_infra::database::{
    DatabaseConnections, PostgresCategoryRepository, PostgresCommentRepository,
    PostgresLocationRepository, PostgresPostRepository, PostgresUserRepository,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
    staff_usernames: Arc<HashSet<String>>,
}

impl AppState {
    /// Build the application state, falling back to the in-memory store when
    /// no database is configured or reachable.
    pub async fn new(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        let connected = Self::connect(config).await;

        #[cfg(not(feature = "postgres"))]
        let connected: Option<Self> = {
            tracing::info!("Running without postgres feature - using in-memory store");
            None
        };

        connected.unwrap_or_else(|| {
            tracing::info!("Application state initialized (in-memory)");
            Self::in_memory(&config.staff_usernames)
        })
    }

    #[cfg(feature = "postgres")]
    async fn connect(config: &AppConfig) -> Option<Self> {
        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return None;
        };

        match DatabaseConnections::init(db_config).await {
            Ok(connections) => {
                tracing::info!("Application state initialized (postgres)");
                Some(Self::postgres(Arc::new(connections), &config.staff_usernames))
            }
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                None
            }
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(connections: Arc<DatabaseConnections>, staff: &[String]) -> Self {
        let conn = connections.main.clone();
        Self {
            users: Arc::new(PostgresUserRepository::new(conn.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(conn.clone())),
            locations: Arc::new(PostgresLocationRepository::new(conn.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn.clone())),
            comments: Arc::new(PostgresCommentRepository::new(conn)),
            db: Some(connections),
            staff_usernames: Arc::new(staff.iter().cloned().collect()),
        }
    }

    /// Every repository backed by one shared [`InMemoryStore`].
    pub fn in_memory(staff: &[String]) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            categories: store.clone(),
            locations: store.clone(),
            posts: store.clone(),
            comments: store,
            #[cfg(feature = "postgres")]
            db: None,
            staff_usernames: Arc::new(staff.iter().cloned().collect()),
        }
    }

    /// Roles carried by a token issued to `username`.
    pub fn roles_for(&self, username: &str) -> Vec<String> {
        let mut roles = vec![ROLE_USER.to_string()];
        if self.staff_usernames.contains(username) {
            roles.push(ROLE_STAFF.to_string());
        }
        roles
    }
}
