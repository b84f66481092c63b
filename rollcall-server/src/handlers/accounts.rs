use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rollcall_model::{
    AccountDetails, AccountId,
    api::{
        ApiResponse, CreateAccountRequest, EmailQuery, ListAccountsQuery,
        ListAccountsResponse, UpdateAccountRequest,
    },
};
use tracing::info;
use uuid::Uuid;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
    extract::{ApiJson, ApiQuery},
};

fn parse_account_id(raw: &str) -> AppResult<AccountId> {
    Uuid::parse_str(raw.trim())
        .map(AccountId)
        .map_err(|_| {
            AppError::bad_request(format!("Invalid account id: {raw}"))
        })
}

pub async fn create_account_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AccountDetails>>)> {
    let account = state.accounts.create(request).await?;
    info!(account_id = %account.id, "account created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(account.details())),
    ))
}

pub async fn get_account_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<AccountDetails>>> {
    let id = parse_account_id(&id)?;
    let account = state.accounts.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(account.into())))
}

pub async fn lookup_account_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmailQuery>,
) -> AppResult<Json<ApiResponse<AccountDetails>>> {
    let account = state.accounts.get_by_email(&query.email).await?;
    Ok(Json(ApiResponse::success(account.into())))
}

/// List accounts one page at a time.
///
/// `page_token` is whatever the previous page returned as
/// `next_page_token`; an empty token starts from the beginning and an empty
/// `next_page_token` marks the last page.
pub async fn list_accounts_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListAccountsQuery>,
) -> AppResult<Json<ApiResponse<ListAccountsResponse>>> {
    let page = state
        .accounts
        .list(query.page_size, &query.page_token)
        .await?;

    Ok(Json(ApiResponse::success(ListAccountsResponse {
        accounts: page.accounts.into_iter().map(AccountDetails::from).collect(),
        next_page_token: page.next_cursor,
    })))
}

pub async fn update_account_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> AppResult<Json<ApiResponse<AccountDetails>>> {
    let id = parse_account_id(&id)?;
    let account = state.accounts.update(id, request).await?;
    info!(account_id = %account.id, "account updated");
    Ok(Json(ApiResponse::success(account.into())))
}

pub async fn delete_account_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_account_id(&id)?;
    state.accounts.delete(id).await?;
    info!(account_id = %id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
