//! Request/response payloads and routes of the account RPC surface.

use crate::{
    account::{AccountDetails, AccountInput},
    image::ImageUpload,
};

macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Versioned API route definitions shared by the server and its clients
pub mod routes {
    pub const HEALTH: &str = "/health";

    pub mod v1 {
        pub mod accounts {
            pub const COLLECTION: &str = v1_path!("/accounts");
            pub const ITEM: &str = v1_path!("/accounts/{id}");
            pub const LOOKUP: &str = v1_path!("/accounts/lookup");
        }

        pub mod auth {
            pub const EMAIL: &str = v1_path!("/auth/email");
            pub const PASSWORD_TOKEN: &str = v1_path!("/auth/password-token");
            pub const PASSWORD_RESET: &str = v1_path!("/auth/password-reset");
            pub const CONFIRM: &str = v1_path!("/auth/confirm");
        }
    }

    pub mod utils {
        /// Substitute a single `{name}` path parameter.
        pub fn replace_param(
            path: &str,
            param: &str,
            value: impl AsRef<str>,
        ) -> String {
            path.replace(param, value.as_ref())
        }
    }
}

/// Uniform envelope for every API response.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApiResponse<T> {
    pub status: String,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub data: Option<T>,
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreateAccountRequest {
    pub account: Option<AccountInput>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub password: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateAccountRequest {
    pub account: Option<AccountInput>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListAccountsQuery {
    #[cfg_attr(feature = "serde", serde(default))]
    pub page_size: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub page_token: String,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListAccountsResponse {
    pub accounts: Vec<AccountDetails>,
    /// Empty when the returned page was the last one
    pub next_page_token: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuthenticateByEmailRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AuthenticateByEmailRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticateByEmailRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratePasswordTokenRequest {
    pub email: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratePasswordTokenResponse {
    pub token: String,
}

#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResetPasswordRequest {
    pub token: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub password: String,
}

impl std::fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetPasswordRequest").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfirmAccountRequest {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::routes::{utils::replace_param, v1};

    #[test]
    fn item_route_substitution() {
        assert_eq!(
            replace_param(v1::accounts::ITEM, "{id}", "abc"),
            "/api/v1/accounts/abc"
        );
    }
}
