//! CLI command implementations

use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::models::{NewUser, ProfileUpdate, UserUpdate};
use crate::auth::{inspect_token, AuthContext, FileTokenStore, User};
use crate::cli::{
    confirm, emit, error, info, print_location_detail, print_location_table, print_permission_table,
    print_permit_table, print_tank_table, print_user_detail, print_user_permissions, print_user_table,
    prompt_input, prompt_new_password, prompt_password, success, warn, with_spinner, LocationAction,
    OutputFormat, PasswordAction, PermissionAction, PermitAction, TankAction, UserAction,
};
use crate::config::{self, loader::CONFIG_FILENAME, Config};
use crate::error::Error;
use crate::facilities::{
    Location, LocationUpdate, NewLocation, NewPermit, NewTank, Permit, PermitUpdate, Tank,
    TankUpdate,
};
use crate::views::ResourceView;

/// Everything a command needs: configuration, the client and the session
pub struct Context {
    pub config: Config,
    pub client: Arc<ApiClient>,
    pub auth: AuthContext,
}

impl Context {
    /// Load configuration, open the session file and restore the session
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = config::load_config(config_path)?;
        let store = Arc::new(FileTokenStore::new(config.session.path()));
        let client = Arc::new(ApiClient::new(&config.api, store)?);

        let mut auth = AuthContext::new(Arc::clone(&client));
        auth.restore()?;

        tracing::debug!("Using backend at {}", client.base_url());
        Ok(Self {
            config,
            client,
            auth,
        })
    }

    fn require_login(&self) -> Result<()> {
        if self.auth.is_authenticated() {
            Ok(())
        } else {
            Err(Error::NotAuthenticated.into())
        }
    }

    /// Refuse early when the cached profile says the action is not allowed.
    /// Without a cached profile the server decides.
    fn require_permission(&self, code: &str) -> Result<()> {
        self.require_login()?;
        match self.auth.user() {
            Some(_) if !self.auth.has_permission(code) => {
                anyhow::bail!("You do not have permission to do this ({})", code)
            }
            _ => Ok(()),
        }
    }

    fn view<R: crate::api::Resource>(&self) -> ResourceView<R> {
        ResourceView::new(Arc::clone(&self.client))
    }

    /// Report a failed authenticated call. A 401 that outlived the token
    /// refresh also ends the stored session.
    fn reject(&mut self, action: &str, e: Error) -> anyhow::Error {
        match self.auth.handle_rejection(&e) {
            Ok(true) => warn("Your session has expired. Run 'facility login' again."),
            Ok(false) => {}
            Err(clear) => tracing::warn!("Could not clear the session: {}", clear),
        }
        report(action, e)
    }
}

/// Print the failure inline and hand it back for the exit status
fn report(action: &str, e: Error) -> anyhow::Error {
    error(&format!("{}: {}", action, e.user_message()));
    e.into()
}

/// Write a facility.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Set the backend URL and run 'facility login'");

    Ok(())
}

pub async fn login(config_path: Option<&Path>, email: Option<String>, password: Option<String>) -> Result<()> {
    let mut ctx = Context::open(config_path)?;

    let email = match email {
        Some(email) => email,
        None => prompt_input("Email")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt_password("Password")?,
    };

    match with_spinner("Logging in...", ctx.auth.login(&email, &password)).await {
        Ok(user) => {
            success(&format!("Logged in as {}", user.display_name()));
            Ok(())
        }
        Err(e) => Err(report("Login failed", e)),
    }
}

pub async fn logout(config_path: Option<&Path>) -> Result<()> {
    let mut ctx = Context::open(config_path)?;

    if !ctx.auth.is_authenticated() {
        info("Not logged in");
        return Ok(());
    }

    with_spinner("Logging out...", ctx.auth.logout()).await?;
    success("Logged out");
    Ok(())
}

pub async fn whoami(config_path: Option<&Path>, refresh: bool, format: OutputFormat) -> Result<()> {
    let mut ctx = Context::open(config_path)?;
    ctx.require_login()?;

    if refresh || ctx.auth.user().is_none() {
        let loaded = with_spinner("Loading profile...", ctx.auth.reload_profile())
            .await
            .map(|_| ());
        if let Err(e) = loaded {
            return Err(ctx.reject("Could not load profile", e));
        }
    }

    let user = ctx.auth.require_user()?;
    let claims = ctx
        .auth
        .session()?
        .access_token
        .and_then(|token| inspect_token(&token).ok());

    emit(user, format, |u| print_user_detail(u, claims.as_ref()))
}

pub async fn can(config_path: Option<&Path>, code: &str) -> Result<()> {
    let ctx = Context::open(config_path)?;
    ctx.require_login()?;

    if ctx.auth.has_permission(code) {
        success(&format!("Allowed: {}", code));
        Ok(())
    } else {
        anyhow::bail!("Not allowed: {}", code)
    }
}

pub async fn profile(config_path: Option<&Path>, update: ProfileUpdate) -> Result<()> {
    let mut ctx = Context::open(config_path)?;
    ctx.require_login()?;

    let saved = with_spinner("Saving profile...", ctx.auth.update_profile(&update))
        .await
        .map(|user| user.display_name());
    match saved {
        Ok(name) => {
            success(&format!("Updated profile for {}", name));
            Ok(())
        }
        Err(e) => Err(ctx.reject("Could not update profile", e)),
    }
}

pub async fn password(config_path: Option<&Path>, action: PasswordAction) -> Result<()> {
    let mut ctx = Context::open(config_path)?;
    let client = Arc::clone(&ctx.client);

    match action {
        PasswordAction::Change => {
            ctx.require_login()?;
            let old = prompt_password("Current password")?;
            let new = prompt_new_password()?;
            with_spinner("Changing password...", client.change_password(&old, &new))
                .await
                .map_err(|e| ctx.reject("Could not change password", e))?;
            success("Password changed");
        }
        PasswordAction::Reset { email } => {
            with_spinner("Requesting reset...", client.request_password_reset(&email))
                .await
                .map_err(|e| report("Could not request a reset", e))?;
            success(&format!("If {} has an account, a reset link is on its way", email));
        }
        PasswordAction::Confirm { uid, token } => {
            let new = prompt_new_password()?;
            with_spinner(
                "Setting password...",
                client.confirm_password_reset(&uid, &token, &new),
            )
            .await
            .map_err(|e| report("Could not reset password", e))?;
            success("Password reset. Log in with the new password.");
        }
    }

    Ok(())
}

pub async fn locations(config_path: Option<&Path>, action: LocationAction) -> Result<()> {
    let mut ctx = Context::open(config_path)?;
    let client = Arc::clone(&ctx.client);
    ctx.require_login()?;
    let mut view = ctx.view::<Location>();

    match action {
        LocationAction::List { format } => {
            let items = with_spinner("Loading locations...", view.load(&[]))
                .await
                .map_err(|e| ctx.reject("Could not load locations", e))?;
            emit(items, format, print_location_table)?;
        }
        LocationAction::Get { id, format } => {
            let location = with_spinner("Loading location...", client.get_location(id))
                .await
                .map_err(|e| ctx.reject("Could not load location", e))?;
            emit(&location, format, print_location_detail)?;
        }
        LocationAction::Create {
            name,
            address,
            city,
            state,
            zip,
            latitude,
            longitude,
        } => {
            ctx.require_permission("facilities.add_location")?;
            let payload = NewLocation {
                name,
                address,
                city,
                state,
                zip_code: zip,
                latitude,
                longitude,
            };
            let created = with_spinner("Creating location...", view.create(&payload))
                .await
                .map_err(|e| ctx.reject("Could not create location", e))?;
            success(&format!("Created location {} ({})", created.name, created.id));
        }
        LocationAction::Update {
            id,
            name,
            address,
            city,
            state,
            zip,
            active,
        } => {
            ctx.require_permission("facilities.change_location")?;
            let patch = LocationUpdate {
                name,
                address,
                city,
                state,
                zip_code: zip,
                is_active: active,
            };
            let updated = with_spinner("Saving location...", view.update(id, &patch))
                .await
                .map_err(|e| ctx.reject("Could not update location", e))?;
            success(&format!("Updated location {}", updated.name));
        }
        LocationAction::Delete { id, force } => {
            ctx.require_permission("facilities.delete_location")?;
            if !force && !confirm(&format!("Delete location {} and everything recorded at it?", id))? {
                info("Cancelled");
                return Ok(());
            }
            with_spinner("Deleting location...", view.remove(id))
                .await
                .map_err(|e| ctx.reject("Could not delete location", e))?;
            success(&format!("Deleted location {}", id));
        }
    }

    Ok(())
}

pub async fn tanks(config_path: Option<&Path>, action: TankAction) -> Result<()> {
    let mut ctx = Context::open(config_path)?;
    let client = Arc::clone(&ctx.client);
    ctx.require_login()?;
    let mut view = ctx.view::<Tank>();

    match action {
        TankAction::List { location, format } => {
            let query: Vec<(&str, String)> = location
                .map(|id| vec![("location", id.to_string())])
                .unwrap_or_default();
            let items = with_spinner("Loading tanks...", view.load(&query))
                .await
                .map_err(|e| ctx.reject("Could not load tanks", e))?;
            emit(items, format, print_tank_table)?;
        }
        TankAction::Get { id, format } => {
            let tank = with_spinner("Loading tank...", client.get_tank(id))
                .await
                .map_err(|e| ctx.reject("Could not load tank", e))?;
            emit(std::slice::from_ref(&tank), format, print_tank_table)?;
        }
        TankAction::Create {
            location,
            number,
            product,
            capacity,
            material,
            installed,
            status,
        } => {
            ctx.require_permission("facilities.add_tank")?;
            let payload = NewTank {
                location,
                tank_number: number,
                product,
                capacity,
                material,
                installed_on: installed,
                status,
            };
            let created = with_spinner("Creating tank...", view.create(&payload))
                .await
                .map_err(|e| ctx.reject("Could not create tank", e))?;
            success(&format!("Created tank {} ({})", created.tank_number, created.id));
        }
        TankAction::Update {
            id,
            location,
            number,
            product,
            capacity,
            material,
            status,
        } => {
            ctx.require_permission("facilities.change_tank")?;
            let patch = TankUpdate {
                location,
                tank_number: number,
                product,
                capacity,
                material,
                status,
            };
            let updated = with_spinner("Saving tank...", view.update(id, &patch))
                .await
                .map_err(|e| ctx.reject("Could not update tank", e))?;
            success(&format!("Updated tank {}", updated.tank_number));
        }
        TankAction::Delete { id, force } => {
            ctx.require_permission("facilities.delete_tank")?;
            if !force && !confirm(&format!("Delete tank {}?", id))? {
                info("Cancelled");
                return Ok(());
            }
            with_spinner("Deleting tank...", view.remove(id))
                .await
                .map_err(|e| ctx.reject("Could not delete tank", e))?;
            success(&format!("Deleted tank {}", id));
        }
    }

    Ok(())
}

pub async fn permits(config_path: Option<&Path>, action: PermitAction) -> Result<()> {
    let mut ctx = Context::open(config_path)?;
    let client = Arc::clone(&ctx.client);
    ctx.require_login()?;
    let mut view = ctx.view::<Permit>();

    match action {
        PermitAction::List {
            location,
            expiring,
            format,
        } => {
            let query: Vec<(&str, String)> = location
                .map(|id| vec![("location", id.to_string())])
                .unwrap_or_default();
            let items = with_spinner("Loading permits...", view.load(&query))
                .await
                .map_err(|e| ctx.reject("Could not load permits", e))?;

            let items: Vec<Permit> = match expiring {
                Some(days) => {
                    let today = Utc::now().date_naive();
                    items
                        .iter()
                        .filter(|p| p.expires_within(today, days))
                        .cloned()
                        .collect()
                }
                None => items.to_vec(),
            };
            emit(items.as_slice(), format, print_permit_table)?;
        }
        PermitAction::Get { id, format } => {
            let permit = with_spinner("Loading permit...", client.get_permit(id))
                .await
                .map_err(|e| ctx.reject("Could not load permit", e))?;
            emit(std::slice::from_ref(&permit), format, print_permit_table)?;
        }
        PermitAction::Create {
            location,
            number,
            permit_type,
            authority,
            issued,
            expires,
        } => {
            ctx.require_permission("facilities.add_permit")?;
            if let (Some(issued), Some(expires)) = (issued, expires) {
                if expires < issued {
                    anyhow::bail!("Expiry date {} is before issue date {}", expires, issued);
                }
            }
            let payload = NewPermit {
                location,
                permit_number: number,
                permit_type,
                issuing_authority: authority,
                issued_on: issued,
                expires_on: expires,
            };
            let created = with_spinner("Creating permit...", view.create(&payload))
                .await
                .map_err(|e| ctx.reject("Could not create permit", e))?;
            success(&format!("Created permit {} ({})", created.permit_number, created.id));
        }
        PermitAction::Update {
            id,
            number,
            permit_type,
            authority,
            issued,
            expires,
            status,
        } => {
            ctx.require_permission("facilities.change_permit")?;
            let patch = PermitUpdate {
                permit_number: number,
                permit_type,
                issuing_authority: authority,
                issued_on: issued,
                expires_on: expires,
                status,
            };
            let updated = with_spinner("Saving permit...", view.update(id, &patch))
                .await
                .map_err(|e| ctx.reject("Could not update permit", e))?;
            success(&format!("Updated permit {}", updated.permit_number));
        }
        PermitAction::Delete { id, force } => {
            ctx.require_permission("facilities.delete_permit")?;
            if !force && !confirm(&format!("Delete permit {}?", id))? {
                info("Cancelled");
                return Ok(());
            }
            with_spinner("Deleting permit...", view.remove(id))
                .await
                .map_err(|e| ctx.reject("Could not delete permit", e))?;
            success(&format!("Deleted permit {}", id));
        }
    }

    Ok(())
}

pub async fn users(config_path: Option<&Path>, action: UserAction) -> Result<()> {
    let mut ctx = Context::open(config_path)?;
    let client = Arc::clone(&ctx.client);
    ctx.require_login()?;
    let mut view = ctx.view::<User>();

    match action {
        UserAction::List { format } => {
            ctx.require_permission("accounts.view_user")?;
            let items = with_spinner("Loading users...", view.load(&[]))
                .await
                .map_err(|e| ctx.reject("Could not load users", e))?;
            emit(items, format, print_user_table)?;
        }
        UserAction::Get { id, format } => {
            ctx.require_permission("accounts.view_user")?;
            let user = with_spinner("Loading user...", client.get_user(id))
                .await
                .map_err(|e| ctx.reject("Could not load user", e))?;
            emit(&user, format, |u| print_user_detail(u, None))?;
        }
        UserAction::Create {
            email,
            username,
            role,
            first_name,
            last_name,
            organization,
        } => {
            ctx.require_permission("accounts.add_user")?;
            let password = prompt_new_password()?;
            let payload = NewUser {
                email,
                username,
                password,
                role,
                first_name,
                last_name,
                organization,
            };
            let created = with_spinner("Creating user...", view.create(&payload))
                .await
                .map_err(|e| ctx.reject("Could not create user", e))?;
            success(&format!("Created user {} ({})", created.email, created.id));
        }
        UserAction::Update {
            id,
            email,
            role,
            first_name,
            last_name,
            organization,
            active,
        } => {
            ctx.require_permission("accounts.change_user")?;
            let patch = UserUpdate {
                email,
                role,
                first_name,
                last_name,
                organization,
                is_active: active,
            };
            let updated = with_spinner("Saving user...", view.update(id, &patch))
                .await
                .map_err(|e| ctx.reject("Could not update user", e))?;
            success(&format!("Updated user {}", updated.email));
        }
        UserAction::Delete { id, force } => {
            ctx.require_permission("accounts.delete_user")?;
            if ctx.auth.user().is_some_and(|me| me.id == id) {
                anyhow::bail!("Refusing to delete the account you are logged in with");
            }
            if !force && !confirm(&format!("Delete user {}?", id))? {
                info("Cancelled");
                return Ok(());
            }
            with_spinner("Deleting user...", view.remove(id))
                .await
                .map_err(|e| ctx.reject("Could not delete user", e))?;
            success(&format!("Deleted user {}", id));
        }
    }

    Ok(())
}

pub async fn permissions(config_path: Option<&Path>, action: PermissionAction) -> Result<()> {
    let mut ctx = Context::open(config_path)?;
    let client = Arc::clone(&ctx.client);
    ctx.require_login()?;

    match action {
        PermissionAction::List { format } => {
            let items = with_spinner("Loading permissions...", client.get_permissions())
                .await
                .map_err(|e| ctx.reject("Could not load permissions", e))?;
            emit(items.as_slice(), format, print_permission_table)?;
        }
        PermissionAction::User { id } => {
            let held = with_spinner("Loading permissions...", client.get_user_permissions(id))
                .await
                .map_err(|e| ctx.reject("Could not load permissions", e))?;
            print_user_permissions(held.user_id, &held.permissions);
        }
        PermissionAction::Grant { user_id, code } => {
            ctx.require_permission("permissions.manage_permissions")?;
            with_spinner("Granting...", client.grant_permission(user_id, &code))
                .await
                .map_err(|e| ctx.reject("Could not grant permission", e))?;
            success(&format!("Granted {} to user {}", code, user_id));
        }
        PermissionAction::Revoke { user_id, code } => {
            ctx.require_permission("permissions.manage_permissions")?;
            with_spinner("Revoking...", client.revoke_permission(user_id, &code))
                .await
                .map_err(|e| ctx.reject("Could not revoke permission", e))?;
            success(&format!("Revoked {} from user {}", code, user_id));
        }
    }

    Ok(())
}
