use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{extract::FromRef, http::Method, Router};
use axum_extra::extract::cookie::Key;
use sqlx::postgres::PgPoolOptions;
use tera::Tera;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    accounts::{self, PasswordResetService},
    authentication::{self, DynCredentialVerifier, PasswordCredentialVerifier},
    database::PostgresConnection,
    email::clients::{ConsoleMailer, DynEmailClient, SendgridMailer},
    rate_limit::{DynRateLimiter, RedisRateLimiter},
    repos::{DynAccountRepo, DynReviewRepo},
    reviews,
};

pub struct Options {
    pub base_url: String,

    pub database_pool_size: u32,
    pub database_timeout_seconds: u8,
    pub database_url: String,

    pub email_from_address: String,
    pub email_from_name: String,

    pub redis_url: String,
    pub secret_key: String,
    pub sendgrid_key: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    cookie_key: Key,
    credential_verifier: DynCredentialVerifier,
    rate_limiter: DynRateLimiter,
    reset_service: PasswordResetService,
    review_repo: DynReviewRepo,
}

pub async fn serve(opts: Options) -> anyhow::Result<()> {
    let db_pool = PgPoolOptions::new()
        .max_connections(opts.database_pool_size)
        .acquire_timeout(Duration::from_secs(opts.database_timeout_seconds.into()))
        .connect(&opts.database_url)
        .await?;

    let db = PostgresConnection::new(db_pool);

    let account_repo: DynAccountRepo = Arc::new(db.clone());
    let review_repo: DynReviewRepo = Arc::new(db);

    let rate_limiter: DynRateLimiter = Arc::new(RedisRateLimiter::new(&opts.redis_url)?);

    let email_client: DynEmailClient = match opts.sendgrid_key {
        Some(api_key) => Arc::new(SendgridMailer::new(
            api_key,
            opts.email_from_address,
            opts.email_from_name,
        )),
        None => Arc::new(ConsoleMailer {
            from: format!("{} <{}>", opts.email_from_name, opts.email_from_address),
        }),
    };

    let templates = Tera::new("templates/**/*.txt")?;

    let reset_service = PasswordResetService::new(
        account_repo.clone(),
        opts.base_url,
        email_client,
        templates,
    );
    let credential_verifier: DynCredentialVerifier =
        Arc::new(PasswordCredentialVerifier::new(account_repo));

    let state = AppState {
        cookie_key: Key::derive_from(opts.secret_key.as_bytes()),
        credential_verifier,
        rate_limiter,
        reset_service,
        review_repo,
    };

    let app = Router::new()
        .nest("/account", accounts::http::routes())
        .nest("/authentication", authentication::http::routes())
        .nest("/reviews", reviews::http::routes())
        .layer(cors_layer())
        .with_state(state);

    axum::Server::bind(&"0.0.0.0:8000".parse().unwrap())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

fn cors_layer() -> CorsLayer {
    use axum::http::header;

    // Credentialed requests require the allowed origin to match the request
    // origin.
    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers(vec![header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
        .allow_methods(vec![
            Method::DELETE,
            Method::GET,
            Method::OPTIONS,
            Method::POST,
            Method::PUT,
        ])
        .allow_origin(AllowOrigin::mirror_request())
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for DynCredentialVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.credential_verifier.clone()
    }
}

impl FromRef<AppState> for DynRateLimiter {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limiter.clone()
    }
}

impl FromRef<AppState> for PasswordResetService {
    fn from_ref(state: &AppState) -> Self {
        state.reset_service.clone()
    }
}

impl FromRef<AppState> for DynReviewRepo {
    fn from_ref(state: &AppState) -> Self {
        state.review_repo.clone()
    }
}
