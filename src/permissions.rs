//! Permission codes granted to users

use serde::{Deserialize, Serialize};

use crate::api::Resource;

/// A capability a user can be granted, identified by `code`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Definitions are managed on the backend; the client only reads them
#[derive(Debug, Serialize)]
pub enum ReadOnly {}

impl Resource for Permission {
    const PATH: &'static str = "/permissions/";
    const NAME: &'static str = "permission";
    type Create = ReadOnly;
    type Update = ReadOnly;

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Serialize)]
pub struct PermissionChange<'a> {
    pub code: &'a str,
}

/// Permissions held by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPermissions {
    pub user_id: i64,
    #[serde(default)]
    pub permissions: Vec<String>,
}
