use std::{
    sync::{atomic::AtomicU64, Arc},
    time::Duration,
};

use anyhow::Context;
use axum::extract::FromRef;

use crate::{
    auth::{jwt::JwtKeys, services::RefreshTokenService},
    chirps::services::ChirpService,
    config::AppConfig,
    store::Store,
    users::services::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub keys: JwtKeys,
    pub users: UserService,
    pub chirps: ChirpService,
    pub sessions: RefreshTokenService,
    pub hits: Arc<AtomicU64>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = Store::open(&config.database_path)
            .await
            .with_context(|| format!("open store {}", config.database_path.display()))?;
        Ok(Self::from_parts(Arc::new(config), Arc::new(store)))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<Store>) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        let refresh_ttl = Duration::from_secs(config.jwt.refresh_ttl_seconds);
        Self {
            users: UserService::new(Arc::clone(&store)),
            chirps: ChirpService::new(Arc::clone(&store)),
            sessions: RefreshTokenService::new(Arc::clone(&store), keys.clone(), refresh_ttl),
            keys,
            store,
            config,
            hits: Arc::new(AtomicU64::new(0)),
        }
    }

    #[cfg(test)]
    pub async fn fake(dir: &std::path::Path) -> Self {
        use crate::config::JwtConfig;

        let config = AppConfig {
            database_path: dir.join("database.json"),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "chirpy".into(),
                ttl_seconds: 3600,
                refresh_ttl_seconds: crate::auth::refresh::DEFAULT_REFRESH_TTL.as_secs(),
            },
            polka_key: "polka-test-key".into(),
            fileserver_root: dir.to_path_buf(),
            host: "127.0.0.1".into(),
            port: 0,
        };
        Self::init(config).await.expect("fake state")
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
