use axum::{Json, extract::State};
use rollcall_model::{
    AccountDetails,
    api::{
        ApiResponse, AuthenticateByEmailRequest, ConfirmAccountRequest,
        GeneratePasswordTokenRequest, GeneratePasswordTokenResponse,
        ResetPasswordRequest,
    },
};
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppResult, extract::ApiJson};

/// Check an email/password pair. Unknown emails and wrong passwords are
/// reported as different errors, matching the account lookup semantics.
pub async fn authenticate_by_email_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AuthenticateByEmailRequest>,
) -> AppResult<Json<ApiResponse<AccountDetails>>> {
    let account = state
        .accounts
        .authenticate_by_email(&request.email, &request.password)
        .await?;
    Ok(Json(ApiResponse::success(account.into())))
}

pub async fn generate_password_token_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GeneratePasswordTokenRequest>,
) -> AppResult<Json<ApiResponse<GeneratePasswordTokenResponse>>> {
    let token = state.accounts.generate_password_token(&request.email).await?;
    Ok(Json(ApiResponse::success(GeneratePasswordTokenResponse {
        token,
    })))
}

pub async fn reset_password_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<AccountDetails>>> {
    let account = state
        .accounts
        .reset_password(&request.token, &request.password)
        .await?;
    info!(account_id = %account.id, "password reset");
    Ok(Json(ApiResponse::success(account.into())))
}

pub async fn confirm_account_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ConfirmAccountRequest>,
) -> AppResult<Json<ApiResponse<AccountDetails>>> {
    let account = state.accounts.confirm_account(&request.token).await?;
    info!(account_id = %account.id, "account confirmed");
    Ok(Json(ApiResponse::success(account.into())))
}
