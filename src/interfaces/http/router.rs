//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::common::{ErrorResponse, StatusResponse};
use super::modules::health::{self, HealthState};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::users::{self, UserHandlerState};
use crate::application::UserService;
use crate::domain::{Comment, Rating, Reservation};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        users::create_user,
        users::login,
        users::get_user,
        users::list_users,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(
            StatusResponse,
            ErrorResponse,
            health::HealthResponse,
            users::CreateUserRequest,
            users::LoginRequest,
            users::LoginResponse,
            users::UpdateUserRequest,
            users::UserProfileResponse,
            users::UserSummary,
            users::UsersResponse,
            Rating,
            Comment,
            Reservation,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database reachability"),
        (name = "Users", description = "User accounts, login and activity"),
    ),
    info(
        title = "Users Service API",
        version = "1.0.0",
        description = "User identity CRUD, login and aggregated charger activity"
    )
)]
pub struct ApiDoc;

/// Everything the router needs from bootstrap.
pub struct RouterDeps {
    pub user_service: Arc<UserService>,
    pub db: DatabaseConnection,
    /// `None` leaves `/metrics` unrouted
    pub metrics: Option<PrometheusHandle>,
}

/// Create the API router with all routes
pub fn create_api_router(deps: RouterDeps) -> Router {
    let user_state = UserHandlerState {
        user_service: deps.user_service,
    };
    let health_state = HealthState {
        db: deps.db,
        started_at: Arc::new(Instant::now()),
    };

    let user_routes = Router::new()
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/login", post(users::login))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .with_state(user_state);

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    let mut router = Router::new()
        .merge(user_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    if let Some(handle) = deps.metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .route_layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
