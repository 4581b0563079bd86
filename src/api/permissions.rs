//! `/permissions/` endpoints

use reqwest::Method;

use super::client::{ApiClient, Auth};
use crate::error::Result;
use crate::permissions::{Permission, PermissionChange, UserPermissions};

fn user_path(user_id: i64) -> String {
    format!("/permissions/users/{}/", user_id)
}

impl ApiClient {
    pub async fn get_permissions(&self) -> Result<Vec<Permission>> {
        self.list::<Permission>(&[]).await
    }

    pub async fn get_user_permissions(&self, user_id: i64) -> Result<UserPermissions> {
        self.request(Method::GET, &user_path(user_id), &[], None::<&()>, Auth::Bearer)
            .await
    }

    pub async fn grant_permission(&self, user_id: i64, code: &str) -> Result<UserPermissions> {
        let path = format!("{}grant/", user_path(user_id));
        let granted = self
            .request(Method::POST, &path, &[], Some(&PermissionChange { code }), Auth::Bearer)
            .await?;
        tracing::info!("Granted {} to user {}", code, user_id);
        Ok(granted)
    }

    pub async fn revoke_permission(&self, user_id: i64, code: &str) -> Result<UserPermissions> {
        let path = format!("{}revoke/", user_path(user_id));
        let revoked = self
            .request(Method::POST, &path, &[], Some(&PermissionChange { code }), Auth::Bearer)
            .await?;
        tracing::info!("Revoked {} from user {}", code, user_id);
        Ok(revoked)
    }
}
