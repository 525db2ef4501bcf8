use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/competitions", competition_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn competition_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::competition::list_competitions)
                .post(handlers::competition::create_competition),
        )
        .route(
            "/{id}",
            get(handlers::competition::get_competition)
                .patch(handlers::competition::update_competition)
                .delete(handlers::competition::delete_competition),
        )
        .route("/{id}/advance", post(handlers::competition::advance_status))
        .route(
            "/{id}/force-status",
            post(handlers::competition::force_competition_status),
        )
        .route(
            "/{id}/submissions",
            get(handlers::submission::list_submissions)
                .post(handlers::submission::create_submission),
        )
        .nest("/{id}/voting", voting_routes())
        .route("/{id}/winner", post(handlers::voting::select_winner))
        .route(
            "/{id}/song-creator-picks",
            get(handlers::voting::get_song_creator_picks)
                .put(handlers::voting::put_song_creator_picks),
        )
        .route("/{id}/dashboard", get(handlers::results::dashboard))
        .route(
            "/{id}/results",
            get(handlers::results::competition_results),
        )
}

fn voting_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", post(handlers::voting::create_groups))
        .route("/assignment", get(handlers::voting::my_assignment))
        .route("/round1/votes", post(handlers::voting::cast_round1_vote))
        .route(
            "/round1/disqualify-non-voters",
            post(handlers::voting::disqualify_non_voters),
        )
        .route("/round1/tally", post(handlers::voting::tally_round1))
        .route("/round2/setup", post(handlers::voting::setup_round2))
        .route(
            "/round2/eligibility",
            get(handlers::voting::round2_eligibility),
        )
        .route("/round2/votes", post(handlers::voting::cast_round2_vote))
        .route("/round2/tally", post(handlers::voting::tally_round2))
}
