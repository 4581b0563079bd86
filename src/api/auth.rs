//! `/auth/` endpoints

use reqwest::Method;

use super::client::{ApiClient, Auth};
use crate::auth::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, NewUser, PasswordResetConfirm,
    PasswordResetRequest, ProfileUpdate, RefreshRequest, User, UserUpdate,
};
use crate::error::Result;

impl ApiClient {
    /// Exchange credentials for a token pair. Does not touch the token store.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.request(Method::POST, "/auth/login/", &[], Some(&request), Auth::Anonymous)
            .await
    }

    /// Blacklist the refresh token on the server
    pub async fn logout(&self, refresh: &str) -> Result<()> {
        self.request_no_content(
            Method::POST,
            "/auth/logout/",
            Some(&RefreshRequest { refresh }),
            Auth::Bearer,
        )
        .await
    }

    pub async fn get_profile(&self) -> Result<User> {
        self.request(Method::GET, "/auth/profile/", &[], None::<&()>, Auth::Bearer)
            .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        self.request(Method::PATCH, "/auth/profile/", &[], Some(update), Auth::Bearer)
            .await
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let request = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.request_no_content(Method::POST, "/auth/change-password/", Some(&request), Auth::Bearer)
            .await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let request = PasswordResetRequest {
            email: email.to_string(),
        };
        self.request_no_content(Method::POST, "/auth/password-reset/", Some(&request), Auth::Anonymous)
            .await
    }

    pub async fn confirm_password_reset(&self, uid: &str, token: &str, new_password: &str) -> Result<()> {
        let request = PasswordResetConfirm {
            uid: uid.to_string(),
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        self.request_no_content(
            Method::POST,
            "/auth/password-reset/confirm/",
            Some(&request),
            Auth::Anonymous,
        )
        .await
    }

    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.list::<User>(&[]).await
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.get::<User>(id).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.create::<User>(user).await
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<User> {
        self.update::<User>(id, update).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.delete::<User>(id).await
    }
}
