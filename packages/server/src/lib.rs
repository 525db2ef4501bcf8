pub mod config;
pub mod database;
pub mod engine;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderValue, header};
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mixoff Competition API",
        version = "1.0.0",
        description = "API for multi-round, peer-judged audio mixing competitions"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::competition::create_competition,
        handlers::competition::list_competitions,
        handlers::competition::get_competition,
        handlers::competition::update_competition,
        handlers::competition::delete_competition,
        handlers::competition::advance_status,
        handlers::competition::force_competition_status,
        handlers::submission::create_submission,
        handlers::submission::list_submissions,
        handlers::voting::create_groups,
        handlers::voting::my_assignment,
        handlers::voting::cast_round1_vote,
        handlers::voting::disqualify_non_voters,
        handlers::voting::tally_round1,
        handlers::voting::setup_round2,
        handlers::voting::round2_eligibility,
        handlers::voting::cast_round2_vote,
        handlers::voting::tally_round2,
        handlers::voting::select_winner,
        handlers::voting::get_song_creator_picks,
        handlers::voting::put_song_creator_picks,
        handlers::results::dashboard,
        handlers::results::competition_results,
    ),
    tags(
        (name = "Auth", description = "Authentication and user profile"),
        (name = "Competitions", description = "Competition CRUD"),
        (name = "Lifecycle", description = "Status advancement and overrides"),
        (name = "Submissions", description = "Mix entries"),
        (name = "Round 1", description = "Group assignment and group-stage voting"),
        (name = "Round 2", description = "Final-round voting and winner resolution"),
        (name = "Results", description = "Dashboards and standings"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age));

    if config.allow_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allow_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);
    let api = ApiDoc::openapi();

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
