pub mod db;
pub mod error;
pub mod handlers;
pub mod ical;
pub mod identity;
pub mod models;
pub mod openapi;
pub mod settings;
pub mod store;
pub mod toggle;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use handlers::{
    create_class, delete_class, get_class, healthz_live, healthz_ready, list_classes, my_classes,
    my_classes_ical, register_member, root, toggle_booking, update_class,
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::db::SqliteStore;
use crate::ical::ICalExporter;
use crate::openapi::ApiDoc;
use crate::settings::Settings;
use crate::toggle::ToggleService;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<SqliteStore>,
    pub toggle: ToggleService,
    pub exporter: Arc<ICalExporter>,
}

impl AppState {
    pub fn new(settings: Settings, store: SqliteStore) -> Self {
        let store = Arc::new(store);
        let toggle = ToggleService::new(store.clone(), store.clone(), store.clone());
        Self {
            settings,
            store,
            toggle,
            exporter: Arc::new(ICalExporter::new()),
        }
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let store = SqliteStore::connect(&settings).await?;
    store.migrate().await?;

    let state = AppState::new(settings, store);
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting Gym Booking API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/classes", get(list_classes).post(create_class))
        .route(
            "/classes/{id}",
            get(get_class).put(update_class).delete(delete_class),
        )
        .route("/classes/{id}/toggle", post(toggle_booking))
        .route("/members/{id}", put(register_member))
        .route("/members/me/classes", get(my_classes))
        .route("/members/me/classes.ical", get(my_classes_ical))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer)
}
