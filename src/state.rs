use std::sync::Arc;

use crate::auth::{AuthService, ResetNotifier, TokenCodec};
use crate::config::Config;
use crate::rate_limit::LoginRateLimiter;
use crate::store::Stores;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub stores: Stores,
    pub tokens: TokenCodec,
    pub auth: AuthService,
    pub login_limiter: LoginRateLimiter,
}

impl AppState {
    /// Wire the token codec and auth service from `config`; nothing here reads
    /// the environment.
    pub fn new(config: Config, stores: Stores, notifier: Arc<dyn ResetNotifier>) -> SharedState {
        let tokens = TokenCodec::from_config(&config);
        let auth = AuthService::new(
            stores.users.clone(),
            stores.profiles.clone(),
            tokens.clone(),
            notifier,
            config.reset_token_ttl,
        );

        Arc::new(AppState {
            config,
            stores,
            tokens,
            auth,
            login_limiter: LoginRateLimiter::new(),
        })
    }
}
