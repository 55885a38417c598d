use axum::{middleware, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use formation_api::audit::{AuditLogger, PgAuditSink};
use formation_api::database::manager::DatabaseManager;
use formation_api::middleware::jwt_auth_middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formation_api=info,tower_http=info".into()),
        )
        .init();

    let config = formation_api::config::config();
    tracing::info!("Starting Formation API in {:?} mode", config.environment);

    // The sink looks the pool up per write, so the pipeline exists even
    // when the database is down at startup; /health reports degraded and
    // the writer task logs each failed insert until it recovers.
    AuditLogger::init(std::sync::Arc::new(PgAuditSink::new()));
    if let Err(e) = DatabaseManager::pool().await {
        tracing::warn!("Database unavailable at startup: {}", e);
    }

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("FORMATION_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Formation API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server");

    DatabaseManager::close().await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("ctrl-c handler");
    tracing::info!("Shutdown signal received");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        // Protected API
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_auth_routes() -> Router {
    use axum::routing::{post, put};
    use formation_api::handlers::public::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/activate", put(auth::activate))
        .route("/auth/refresh", post(auth::refresh))
}

fn protected_routes() -> Router {
    use axum::routing::{delete, post};
    use formation_api::handlers::protected::{audit, auth, businesses, groups, roles, root, rules, users};

    Router::new()
        // Session introspection
        .route("/api/auth/whoami", get(auth::whoami))
        // Users and direct role assignment
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/api/users/:id/roles", post(users::assign_role))
        .route("/api/users/:id/roles/:role_id", delete(users::remove_role))
        // IAM roles
        .route("/api/roles", get(roles::list).post(roles::create))
        .route(
            "/api/roles/:id",
            get(roles::get).put(roles::update).delete(roles::delete),
        )
        // Groups, membership, and group-role links
        .route("/api/groups", get(groups::list).post(groups::create))
        .route(
            "/api/groups/:id",
            get(groups::get).put(groups::update).delete(groups::delete),
        )
        .route("/api/groups/:id/members", post(groups::add_member))
        .route("/api/groups/:id/members/:user_id", delete(groups::remove_member))
        .route("/api/groups/:id/roles", post(groups::link_role))
        .route("/api/groups/:id/roles/:role_id", delete(groups::unlink_role))
        // Workflow rules
        .route("/api/rules", get(rules::list).post(rules::create))
        .route("/api/rules/preview", post(rules::preview))
        .route(
            "/api/rules/:id",
            get(rules::get).put(rules::update).delete(rules::delete),
        )
        // Businesses
        .route("/api/businesses", get(businesses::list).post(businesses::create))
        .route(
            "/api/businesses/:id",
            get(businesses::get).put(businesses::update).delete(businesses::delete),
        )
        .route("/api/businesses/:id/requirements", get(businesses::requirements))
        // Audit trail
        .route("/api/audit", get(audit::list))
        // Platform administration
        .route(
            "/api/root/tenants",
            get(root::tenants::list).post(root::tenants::create),
        )
        .route(
            "/api/root/tenants/:id",
            get(root::tenants::get)
                .put(root::tenants::update)
                .delete(root::tenants::delete),
        )
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Formation API",
            "version": version,
            "description": "Multi-tenant business formation backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "public_auth": "/auth/login, /auth/register, /auth/activate, /auth/refresh (public)",
                "auth": "/api/auth/whoami (protected)",
                "users": "/api/users[/:id] (protected)",
                "roles": "/api/roles[/:id] (protected)",
                "groups": "/api/groups[/:id] (protected)",
                "rules": "/api/rules[/:id], /api/rules/preview (protected)",
                "businesses": "/api/businesses[/:id][/requirements] (protected)",
                "audit": "/api/audit (protected)",
                "root": "/api/root/tenants[/:id] (restricted, requires tenants:manage)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
