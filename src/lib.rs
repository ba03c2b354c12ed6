use crate::cli::Args;
use crate::store::{Database, Store, new_store};
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use axum_keycloak_auth::PassthroughMode;
use axum_keycloak_auth::instance::{KeycloakAuthInstance, KeycloakConfig};
use axum_keycloak_auth::layer::KeycloakAuthLayer;
use tracing::info;

pub mod cli;
pub mod export;
pub mod model;
pub mod payloads;
pub mod response;
pub mod scoring;
pub mod session_key;
pub mod store;

mod api;
mod errors;

pub fn init_router(args: &Args) -> anyhow::Result<Router> {
    info!("Opening data file {}...", args.data_file.display());
    let db = Database::open(&args.data_file).context("Failed to open data file")?;
    let store = new_store(db);

    info!("Initializing Keycloak authentication layer...");
    let keycloak_layer =
        init_protection_layer(args).context("Failed to initialize Keycloak layer")?;

    info!("Initializing router...");
    Ok(init_router_internal(store, keycloak_layer))
}

pub fn init_test_router(store: Store) -> Router {
    let auth_api = auth_routes();
    let admin_api = admin_routes();
    let professor_api = professor_routes();
    let student_api = student_routes();

    Router::new()
        .nest("/auth", auth_api)
        .nest("/admin", admin_api)
        .nest("/professor", professor_api)
        .nest("/student", student_api)
        .with_state(store)
}

fn init_router_internal(store: Store, keycloak_layer: KeycloakAuthLayer<String>) -> Router {
    let auth_api = auth_routes().layer(keycloak_layer.clone());
    let admin_api = admin_routes().layer(keycloak_layer.clone());
    let professor_api = professor_routes().layer(keycloak_layer.clone());
    let student_api = student_routes().layer(keycloak_layer.clone());

    Router::new()
        .nest("/auth", auth_api)
        .nest("/admin", admin_api)
        .nest("/professor", professor_api)
        .nest("/student", student_api)
        .with_state(store)
}

fn init_protection_layer(args: &Args) -> anyhow::Result<KeycloakAuthLayer<String>> {
    let config = KeycloakConfig::builder()
        .server(args.keycloak_server_url.clone())
        .realm(args.keycloak_realm.clone())
        .build();

    let instance = KeycloakAuthInstance::new(config);

    let layer = KeycloakAuthLayer::builder()
        .instance(instance)
        .passthrough_mode(PassthroughMode::Block)
        .persist_raw_claims(false)
        .expected_audiences(vec![args.keycloak_audiences.clone()])
        .build();

    Ok(layer)
}

fn auth_routes() -> Router<Store> {
    Router::new()
        .route("/register_student", post(api::auth::register_student))
        .route("/register_professor", post(api::auth::register_professor))
        .route("/login", post(api::auth::login))
        .route("/whoami", get(api::auth::whoami))
}

fn admin_routes() -> Router<Store> {
    Router::new()
        .route("/list_professors", get(api::admin::list_professors))
        .route(
            "/set_professor_status",
            post(api::admin::set_professor_status),
        )
        .route("/delete_professor", post(api::admin::delete_professor))
        .route("/list_groups", get(api::admin::list_groups))
        .route("/create_group", post(api::admin::create_group))
        .route("/rename_group", post(api::admin::rename_group))
        .route("/delete_group", post(api::admin::delete_group))
        .route("/assign_professor", post(api::admin::assign_professor))
        .route("/unassign_professor", post(api::admin::unassign_professor))
        .route("/list_students", get(api::admin::list_students))
        .route("/set_student_group", post(api::admin::set_student_group))
        .route("/delete_student", post(api::admin::delete_student))
        .route("/get_tolerance", get(api::admin::get_tolerance))
        .route("/set_tolerance", post(api::admin::set_tolerance))
        .route("/set_db_enabled", post(api::admin::set_db_enabled))
        .route("/upsert_level", post(api::admin::upsert_level))
        .route("/post_announcement", post(api::admin::post_announcement))
        .route("/get_export_summary", get(api::admin::get_export_summary))
        .route("/export_progress", get(api::admin::export_progress))
}

fn professor_routes() -> Router<Store> {
    Router::new()
        .route("/get_groups", get(api::professor::get_groups))
        .route("/list_students", get(api::professor::list_students))
        .route("/validate_student", post(api::professor::validate_student))
        .route(
            "/set_student_group",
            post(api::professor::set_student_group),
        )
        .route("/set_group_levels", post(api::professor::set_group_levels))
        .route(
            "/get_student_progress",
            get(api::professor::get_student_progress),
        )
        .route(
            "/get_group_statistics",
            get(api::professor::get_group_statistics),
        )
        .route(
            "/get_export_summary",
            get(api::professor::get_export_summary),
        )
        .route("/export_progress", get(api::professor::export_progress))
        .route(
            "/post_announcement",
            post(api::professor::post_announcement),
        )
        .route(
            "/list_announcements",
            get(api::professor::list_announcements),
        )
        .route(
            "/delete_announcement",
            post(api::professor::delete_announcement),
        )
}

fn student_routes() -> Router<Store> {
    Router::new()
        .route("/get_profile", get(api::student::get_profile))
        .route("/get_announcements", get(api::student::get_announcements))
        .route("/get_score", get(api::student::get_score))
        .route("/save_game_session", post(api::student::save_game_session))
        .route("/check_answer", post(api::student::check_answer))
}
