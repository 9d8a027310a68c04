// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, catalog, practice},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Spreadsheet uploads are allowed up to 10 MiB.
const IMPORT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, catalog, practice, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins: [axum::http::HeaderValue; 2] = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Rate limiting on the auth routes; needs connect-info wiring in main
    // before it can be enabled (tower_governor's PeerIpKeyExtractor).
    //
    // let governor_conf = GovernorConfigBuilder::default()
    //     .per_second(2)
    //     .burst_size(5)
    //     .finish()
    //     .unwrap();
    // let governor_conf = Arc::new(governor_conf);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let catalog_routes = Router::new()
        .route("/exam-types", get(catalog::list_exam_types))
        .route("/subjects", get(catalog::list_subjects))
        .route("/topics", get(catalog::list_topics));

    let practice_routes = Router::new()
        .route("/generate", get(practice::generate_paper))
        .route("/leaderboard", get(practice::get_leaderboard))
        // Protected practice routes
        .merge(
            Router::new()
                .route("/submit", post(practice::submit_paper))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/exam-types", post(admin::create_exam_type))
        .route("/exam-types/{id}", delete(admin::delete_exam_type))
        .route("/subjects", post(admin::create_subject))
        .route("/subjects/{id}", delete(admin::delete_subject))
        .route("/topics", post(admin::create_topic))
        .route("/topics/{id}", delete(admin::delete_topic))
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            get(admin::get_question)
                .put(admin::update_question)
                .delete(admin::delete_question),
        )
        .route(
            "/questions/import",
            post(admin::import_questions).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/catalog", catalog_routes)
        .nest("/api/practice", practice_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
