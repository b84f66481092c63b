use axum::{
    Router,
    routing::{get, post},
};
use rollcall_model::api::routes::v1;

use crate::{
    handlers::{accounts, auth},
    infra::app_state::AppState,
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .merge(create_account_routes())
        .merge(create_auth_routes())
}

fn create_account_routes() -> Router<AppState> {
    Router::new()
        .route(
            v1::accounts::COLLECTION,
            get(accounts::list_accounts_handler)
                .post(accounts::create_account_handler),
        )
        .route(v1::accounts::LOOKUP, get(accounts::lookup_account_handler))
        .route(
            v1::accounts::ITEM,
            get(accounts::get_account_handler)
                .put(accounts::update_account_handler)
                .delete(accounts::delete_account_handler),
        )
}

fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route(v1::auth::EMAIL, post(auth::authenticate_by_email_handler))
        .route(
            v1::auth::PASSWORD_TOKEN,
            post(auth::generate_password_token_handler),
        )
        .route(v1::auth::PASSWORD_RESET, post(auth::reset_password_handler))
        .route(v1::auth::CONFIRM, post(auth::confirm_account_handler))
}
