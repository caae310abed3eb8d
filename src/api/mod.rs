//! HTTP surface for the rendering layer.
//!
//! Every route except `/health` identifies the caller by the
//! `X-Wallet-Address` header. Personal routes open a [`PersonalStore`] for
//! that wallet per request; community routes share one [`CommunityPool`].

mod handlers;
mod middleware;

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::clock::{Clock, SystemClock};
use crate::community::CommunityPool;
use crate::db::Database;
use crate::error::Result;
use crate::store::PersonalStore;

pub use middleware::{RateLimiter, SecurityConfig, WalletAddress, WALLET_HEADER};

type WalletLocks = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub community: CommunityPool<Database>,
    pub clock: Arc<dyn Clock>,
    wallet_locks: WalletLocks,
}

/// A [`PersonalStore`] that holds its wallet's lock until dropped, so
/// requests for one wallet run one at a time from load to commit.
pub struct WalletStore {
    store: PersonalStore<Database>,
    _guard: OwnedMutexGuard<()>,
}

impl Deref for WalletStore {
    type Target = PersonalStore<Database>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for WalletStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl AppState {
    pub fn new(db: Database) -> Result<Self> {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Result<Self> {
        let community = CommunityPool::load_with_clock(db.clone(), clock.clone())?;
        Ok(Self {
            db,
            community,
            clock,
            wallet_locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Wait for exclusive access to `wallet`, then load its store.
    pub async fn open_store(&self, wallet: &WalletAddress) -> Result<WalletStore> {
        let guard = self.wallet_lock(&wallet.0).lock_owned().await;
        let store = PersonalStore::open_with_clock(self.db.clone(), &wallet.0, self.clock.clone())?;
        Ok(WalletStore {
            store,
            _guard: guard,
        })
    }

    fn wallet_lock(&self, wallet: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.wallet_locks.lock().expect("wallet lock map poisoned");
        // Forget wallets nobody is waiting on.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(wallet.trim().to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, SecurityConfig::disabled())
}

pub fn create_router_with_config(state: AppState, config: SecurityConfig) -> Router {
    let mut protected = Router::new()
        // Identity
        .route("/session", post(handlers::authenticate))
        .route("/me", get(handlers::get_me))
        // Personal manifestations
        .route(
            "/manifestations",
            get(handlers::list_manifestations).post(handlers::create_manifestation),
        )
        .route(
            "/manifestations/{id}",
            get(handlers::get_manifestation)
                .put(handlers::edit_manifestation)
                .delete(handlers::delete_manifestation),
        )
        .route("/manifestations/{id}/advance", post(handlers::advance_manifestation))
        .route("/manifestations/{id}/share", post(handlers::share_manifestation))
        .route("/stats", get(handlers::get_stats))
        // Daily intent and energy
        .route("/intent", put(handlers::set_daily_intent))
        .route("/intents", get(handlers::list_daily_intents))
        .route("/energy/boost", post(handlers::boost_energy))
        // Community
        .route("/community", get(handlers::list_community))
        .route("/community/stats", get(handlers::get_community_stats))
        .route("/community/{id}", get(handlers::get_community_manifestation))
        .route("/community/{id}/like", post(handlers::toggle_like))
        .route("/community/{id}/support", post(handlers::toggle_support))
        .route("/community/{id}/comments", post(handlers::add_comment));

    if let Some(limiter) = config.rate_limiter.clone() {
        protected = protected.layer(from_fn_with_state(limiter, middleware::rate_limit_middleware));
    }
    if config.api_key.is_some() {
        protected =
            protected.layer(from_fn_with_state(config.clone(), middleware::auth_middleware));
    }

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config)),
        )
        .with_state(state)
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
        }
        None => CorsLayer::permissive(),
    }
}
