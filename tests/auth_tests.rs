//! Session and authorization tests
//!
//! Run with: cargo test --test auth_tests

mod common;

use common::{EMAIL, INITIAL_ACCESS, PASSWORD, REFRESH_TOKEN};
use facility_client::auth::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use facility_client::auth::{AuthContext, AuthState, FileTokenStore, MemoryTokenStore, TokenStore};
use facility_client::cli::{commands, LocationAction, OutputFormat};
use facility_client::error::Error;
use facility_client::facilities::Location;
use facility_client::views::ResourceView;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn file_store(dir: &TempDir) -> Arc<FileTokenStore> {
    Arc::new(FileTokenStore::new(dir.path().join("session.json")))
}

#[tokio::test]
async fn test_context_starts_loading_then_unauthenticated() {
    let backend = common::start().await;
    let client = common::client(&backend, Arc::new(MemoryTokenStore::new()));

    let mut auth = AuthContext::new(client);
    assert_eq!(auth.state(), AuthState::Loading);
    assert_eq!(auth.restore().unwrap(), AuthState::Unauthenticated);
    assert!(auth.user().is_none());
    assert!(!auth.has_permission("facilities.view_location"));
}

#[tokio::test]
async fn test_login_populates_state_and_storage() {
    let backend = common::start().await;
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let mut auth = AuthContext::new(common::client(&backend, store.clone()));
    auth.restore().unwrap();

    let user = auth.login(EMAIL, PASSWORD).await.expect("login");
    assert_eq!(user.email, EMAIL);
    assert_eq!(auth.state(), AuthState::Authenticated);
    assert!(auth.error().is_none());

    assert_eq!(store.get_access().unwrap().as_deref(), Some(INITIAL_ACCESS));
    assert_eq!(store.get_refresh().unwrap().as_deref(), Some(REFRESH_TOKEN));
    assert_eq!(store.get_user().unwrap().map(|u| u.id), Some(7));

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
        assert!(raw.get(key).is_some(), "missing {}", key);
    }
}

#[tokio::test]
async fn test_invalid_login_keeps_prior_session() {
    let backend = common::start().await;
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let mut auth = AuthContext::new(common::client(&backend, store.clone()));
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.expect("first login");
    let before = auth.session().unwrap();

    let err = auth.login(EMAIL, "wrong-password").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(auth.error(), Some("Invalid email or password"));

    assert_eq!(auth.state(), AuthState::Authenticated);
    assert_eq!(auth.user().map(|u| u.email.as_str()), Some(EMAIL));
    assert_eq!(auth.session().unwrap(), before);
}

#[tokio::test]
async fn test_invalid_login_from_logged_out() {
    let backend = common::start().await;
    let store = Arc::new(MemoryTokenStore::new());
    let mut auth = AuthContext::new(common::client(&backend, store.clone()));
    auth.restore().unwrap();

    assert!(auth.login("nobody@example.com", "x").await.is_err());
    assert_eq!(auth.state(), AuthState::Unauthenticated);
    assert_eq!(auth.error(), Some("Invalid email or password"));
    assert!(store.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_removes_all_three_keys() {
    let backend = common::start().await;
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let mut auth = AuthContext::new(common::client(&backend, store.clone()));
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    auth.logout().await.unwrap();

    assert_eq!(backend.state.logout_count(), 1);
    assert_eq!(auth.state(), AuthState::Unauthenticated);
    assert!(store.get_access().unwrap().is_none());
    assert!(store.get_refresh().unwrap().is_none());
    assert!(store.get_user().unwrap().is_none());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let backend = common::start().await;
    let store = Arc::new(MemoryTokenStore::new());
    let mut auth = AuthContext::new(common::client(&backend, store.clone()));
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    backend.state.set(&backend.state.fail_logout, true);
    auth.logout().await.expect("local logout always succeeds");

    assert_eq!(backend.state.logout_count(), 1);
    assert!(store.load().unwrap().is_empty());
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn test_restore_from_file() {
    let backend = common::start().await;
    let dir = TempDir::new().unwrap();

    {
        let mut auth = AuthContext::new(common::client(&backend, file_store(&dir)));
        auth.restore().unwrap();
        auth.login(EMAIL, PASSWORD).await.unwrap();
    }

    let mut auth = AuthContext::new(common::client(&backend, file_store(&dir)));
    assert_eq!(auth.restore().unwrap(), AuthState::Authenticated);
    assert_eq!(auth.require_user().unwrap().email, EMAIL);
    assert!(auth.has_permission("facilities.add_location"));
}

#[tokio::test]
async fn test_has_permission_is_local() {
    let backend = common::start().await;
    let mut auth = AuthContext::new(common::client(&backend, Arc::new(MemoryTokenStore::new())));
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    // Backend gone: permission checks still answer from the cached user
    drop(backend);

    assert!(auth.has_permission("facilities.view_location"));
    assert!(!auth.has_permission("facilities.delete_location"));
}

#[tokio::test]
async fn test_superuser_has_every_permission() {
    let backend = common::start().await;
    backend.state.set(&backend.state.superuser, true);
    let mut auth = AuthContext::new(common::client(&backend, Arc::new(MemoryTokenStore::new())));
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    assert!(auth.has_permission("facilities.delete_location"));
    assert!(auth.has_permission("anything.at_all"));
}

#[tokio::test]
async fn test_reload_profile_replaces_cached_user() {
    let backend = common::start().await;
    let store = Arc::new(MemoryTokenStore::new());
    let mut auth = AuthContext::new(common::client(&backend, store.clone()));
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    let user = auth.reload_profile().await.unwrap();
    assert_eq!(user.first_name, "Olivia");
    assert_eq!(store.get_user().unwrap().unwrap().first_name, "Olivia");
}

#[tokio::test]
async fn test_refresh_exhaustion_ends_session() {
    let backend = common::start().await;
    let store = Arc::new(MemoryTokenStore::new());
    let mut auth = AuthContext::new(common::client(&backend, store.clone()));
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    backend.state.expire_access("access-issued-elsewhere");
    backend.state.set(&backend.state.refresh_ok, false);

    let err = auth.reload_profile().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(backend.state.refresh_count(), 1);
    assert_eq!(auth.state(), AuthState::Unauthenticated);
    assert!(store.load().unwrap().is_empty());
    assert!(matches!(auth.require_user(), Err(Error::NotAuthenticated)));
}

#[tokio::test]
async fn test_refresh_outage_keeps_session() {
    let backend = common::start().await;
    let store = Arc::new(MemoryTokenStore::new());
    let mut auth = AuthContext::new(common::client(&backend, store.clone()));
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    backend.state.expire_access("access-issued-elsewhere");
    backend.state.set(&backend.state.refresh_unavailable, true);

    let err = auth.reload_profile().await.unwrap_err();
    assert!(matches!(err, Error::Server { .. }), "expected 503, got {:?}", err);
    assert_eq!(auth.state(), AuthState::Authenticated);
    assert_eq!(store.get_refresh().unwrap().as_deref(), Some(REFRESH_TOKEN));
    assert!(auth.require_user().is_ok());
}

#[tokio::test]
async fn test_rejected_view_call_ends_session() {
    let backend = common::start().await;
    let dir = TempDir::new().unwrap();
    let client = common::client(&backend, file_store(&dir));
    let mut auth = AuthContext::new(client.clone());
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    backend.state.expire_access("access-issued-elsewhere");
    backend.state.set(&backend.state.refresh_ok, false);

    let mut view: ResourceView<Location> = ResourceView::new(client);
    let err = view.load(&[]).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(auth.handle_rejection(&err).unwrap());
    assert_eq!(auth.state(), AuthState::Unauthenticated);

    // The next run starts logged out
    let mut next = AuthContext::new(common::client(&backend, file_store(&dir)));
    assert_eq!(next.restore().unwrap(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_other_failures_keep_session() {
    let backend = common::start().await;
    let store = Arc::new(MemoryTokenStore::new());
    let client = common::client(&backend, store.clone());
    let mut auth = AuthContext::new(client.clone());
    auth.restore().unwrap();
    auth.login(EMAIL, PASSWORD).await.unwrap();

    let err = client.get_location(999).await.unwrap_err();
    assert!(!auth.handle_rejection(&err).unwrap());
    assert_eq!(auth.state(), AuthState::Authenticated);
    assert!(!store.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_command_clears_session_file() {
    let backend = common::start().await;
    let dir = TempDir::new().unwrap();
    let session_path = dir.path().join("session.json");
    let config_path = dir.path().join("facility.toml");
    fs::write(
        &config_path,
        format!(
            "[api]\nbase_url = \"{}\"\n\n[session]\nfile = \"{}\"\n",
            backend.base_url,
            session_path.display()
        ),
    )
    .unwrap();
    FileTokenStore::new(&session_path)
        .save(INITIAL_ACCESS, REFRESH_TOKEN)
        .unwrap();

    backend.state.expire_access("access-issued-elsewhere");
    backend.state.set(&backend.state.refresh_ok, false);

    let result = commands::locations(
        Some(&config_path),
        LocationAction::List {
            format: OutputFormat::Json,
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(backend.state.refresh_count(), 1);
    assert!(!session_path.exists());
}
