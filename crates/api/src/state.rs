//! Application state shared across handlers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{RepositoryError, SettingsRepository};
use crate::models::settings::Settings;
use crate::services::auth::TokenService;
use crate::services::uploads::FileStore;

const SETTINGS_TTL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenService,
    files: FileStore,
    settings: Cache<(), Settings>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let tokens = TokenService::new(&config.auth);
        let files = FileStore::new(&config.uploads);
        let settings = settings_cache();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                files,
                settings,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn files(&self) -> &FileStore {
        &self.inner.files
    }

    /// Current shop settings, served from a short-lived cache.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the settings row cannot be read.
    pub async fn settings(&self) -> Result<Settings, RepositoryError> {
        read_through(
            &self.inner.settings,
            SettingsRepository::new(&self.inner.pool).get(),
        )
        .await
    }

    /// Drop the cached settings so the next read sees an update.
    pub async fn invalidate_settings(&self) {
        self.inner.settings.invalidate(&()).await;
    }
}

fn settings_cache() -> Cache<(), Settings> {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(SETTINGS_TTL)
        .build()
}

/// Concurrent misses share one `load`; failures are not cached.
async fn read_through<F>(
    cache: &Cache<(), Settings>,
    load: F,
) -> Result<Settings, RepositoryError>
where
    F: Future<Output = Result<Settings, RepositoryError>>,
{
    cache
        .try_get_with((), load)
        .await
        .map_err(|err| Arc::try_unwrap(err).unwrap_or_else(RepositoryError::Shared))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn settings(shop_name: &str) -> Settings {
        Settings {
            shop_name: shop_name.to_string(),
            support_email: String::new(),
            currency: "USD".to_string(),
            shipping_cost: Decimal::from(5),
            free_shipping_threshold: None,
            comments_require_approval: true,
            updated_at: Utc::now(),
        }
    }

    async fn counted_load(
        calls: &AtomicUsize,
        result: Result<Settings, RepositoryError>,
    ) -> Result<Settings, RepositoryError> {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        result
    }

    #[tokio::test]
    async fn test_concurrent_misses_load_once() {
        let cache = settings_cache();
        let calls = AtomicUsize::new(0);

        let (a, b, c) = tokio::join!(
            read_through(&cache, counted_load(&calls, Ok(settings("Emporium")))),
            read_through(&cache, counted_load(&calls, Ok(settings("Stale")))),
            read_through(&cache, counted_load(&calls, Ok(settings("Stale")))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in [a, b, c] {
            assert!(matches!(result, Ok(s) if s.shop_name == "Emporium"));
        }
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache = settings_cache();
        let calls = AtomicUsize::new(0);

        read_through(&cache, counted_load(&calls, Ok(settings("Before"))))
            .await
            .ok();
        cache.invalidate(&()).await;
        let after = read_through(&cache, counted_load(&calls, Ok(settings("After")))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(after, Ok(s) if s.shop_name == "After"));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = settings_cache();
        let calls = AtomicUsize::new(0);

        let failed =
            read_through(&cache, counted_load(&calls, Err(RepositoryError::NotFound))).await;
        assert!(matches!(failed, Err(RepositoryError::NotFound)));

        let loaded =
            read_through(&cache, counted_load(&calls, Ok(settings("Emporium")))).await;
        assert!(loaded.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
