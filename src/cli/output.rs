//! CLI output formatting and prompt utilities

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use super::OutputFormat;
use crate::auth::{Claims, User};
use crate::facilities::{Location, Permit, Tank, TankStatus};
use crate::permissions::Permission;

/// Days before expiry at which a permit is highlighted
const PERMIT_WARNING_DAYS: i64 = 30;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Show a spinner on stderr while `task` is pending
pub async fn with_spinner<F, T>(message: &str, task: F) -> T
where
    F: Future<Output = T>,
{
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let output = task.await;
    pb.finish_and_clear();
    output
}

/// Print `value` as JSON or YAML, or hand it to `table` for the table format
pub fn emit<T, F>(value: &T, format: OutputFormat, table: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T),
{
    match format {
        OutputFormat::Table => table(value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

fn date_cell(date: Option<NaiveDate>) -> Cell {
    Cell::new(
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string()),
    )
}

fn active_cell(active: bool) -> Cell {
    if active {
        Cell::new("yes").fg(Color::Green)
    } else {
        Cell::new("no").fg(Color::Red)
    }
}

pub fn print_location_table(locations: &[Location]) {
    if locations.is_empty() {
        info("No locations found. Create one with 'facility locations create --name <name>'");
        return;
    }

    let mut table = new_table(&["ID", "Name", "Address", "Active"]);
    for location in locations {
        table.add_row(vec![
            Cell::new(location.id),
            Cell::new(&location.name),
            Cell::new(location.full_address()),
            active_cell(location.is_active),
        ]);
    }

    println!("{table}");
}

pub fn print_tank_table(tanks: &[Tank]) {
    if tanks.is_empty() {
        info("No tanks found");
        return;
    }

    let mut table = new_table(&["ID", "Location", "Number", "Product", "Capacity (gal)", "Installed", "Status"]);
    for tank in tanks {
        let status_color = match tank.status {
            TankStatus::Active => Color::Green,
            TankStatus::Closed => Color::Red,
            _ => Color::Yellow,
        };

        table.add_row(vec![
            Cell::new(tank.id),
            Cell::new(tank.location),
            Cell::new(&tank.tank_number),
            Cell::new(&tank.product),
            Cell::new(format!("{:.0}", tank.capacity)),
            date_cell(tank.installed_on),
            Cell::new(tank.status).fg(status_color),
        ]);
    }

    println!("{table}");
}

pub fn print_permit_table(permits: &[Permit]) {
    if permits.is_empty() {
        info("No permits found");
        return;
    }

    let today = Utc::now().date_naive();
    let mut table = new_table(&["ID", "Location", "Number", "Type", "Authority", "Issued", "Expires", "Status"]);
    for permit in permits {
        let expires = if permit.is_expired(today) {
            date_cell(permit.expires_on).fg(Color::Red)
        } else if permit.expires_within(today, PERMIT_WARNING_DAYS) {
            date_cell(permit.expires_on).fg(Color::Yellow)
        } else {
            date_cell(permit.expires_on)
        };

        table.add_row(vec![
            Cell::new(permit.id),
            Cell::new(permit.location),
            Cell::new(&permit.permit_number),
            Cell::new(&permit.permit_type),
            Cell::new(&permit.issuing_authority),
            date_cell(permit.issued_on),
            expires,
            Cell::new(&permit.status),
        ]);
    }

    println!("{table}");
}

pub fn print_user_table(users: &[User]) {
    if users.is_empty() {
        info("No users found");
        return;
    }

    let mut table = new_table(&["ID", "Email", "Name", "Role", "Organization", "Active"]);
    for user in users {
        let role = if user.is_superuser {
            Cell::new("superuser").fg(Color::Magenta)
        } else {
            Cell::new(user.role)
        };

        table.add_row(vec![
            Cell::new(user.id),
            Cell::new(&user.email),
            Cell::new(user.display_name()),
            role,
            Cell::new(user.organization.as_deref().unwrap_or("-")),
            active_cell(user.is_active),
        ]);
    }

    println!("{table}");
}

pub fn print_permission_table(permissions: &[Permission]) {
    if permissions.is_empty() {
        info("No permissions defined");
        return;
    }

    let mut table = new_table(&["ID", "Code", "Name", "Description"]);
    for permission in permissions {
        table.add_row(vec![
            Cell::new(permission.id),
            Cell::new(&permission.code),
            Cell::new(&permission.name),
            Cell::new(&permission.description),
        ]);
    }

    println!("{table}");
}

/// Print detailed user information
pub fn print_user_detail(user: &User, claims: Option<&Claims>) {
    println!("{}", "User Details".bold().underline());
    println!();
    println!("  {} {}", "Name:".bold(), user.display_name());
    println!("  {} {}", "Email:".bold(), user.email);
    if !user.username.is_empty() {
        println!("  {} {}", "Username:".bold(), user.username);
    }
    println!("  {} {}", "Role:".bold(), user.role);
    if let Some(org) = &user.organization {
        println!("  {} {}", "Organization:".bold(), org);
    }
    if user.is_superuser {
        println!("  {} {}", "Superuser:".bold(), "yes".magenta());
    }

    if let Some(expires) = claims.and_then(Claims::expires_at) {
        let label = if expires < Utc::now() {
            "expired".red().to_string()
        } else {
            expires.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        };
        println!("  {} {}", "Access token:".bold(), label);
    }

    if !user.permissions.is_empty() {
        println!();
        println!("  {}", "Permissions:".bold());
        for code in &user.permissions {
            println!("    - {}", code);
        }
    }
}

pub fn print_location_detail(location: &Location) {
    println!("{}", "Location Details".bold().underline());
    println!();
    println!("  {} {}", "ID:".bold(), location.id);
    println!("  {} {}", "Name:".bold(), location.name);
    println!("  {} {}", "Address:".bold(), location.full_address());
    if let (Some(lat), Some(lon)) = (location.latitude, location.longitude) {
        println!("  {} {:.5}, {:.5}", "Coordinates:".bold(), lat, lon);
    }
    println!(
        "  {} {}",
        "Active:".bold(),
        if location.is_active { "yes".green() } else { "no".red() }
    );
}

pub fn print_user_permissions(user_id: i64, codes: &[String]) {
    if codes.is_empty() {
        info(&format!("User {} holds no explicit permissions", user_id));
        return;
    }
    println!("{}", format!("Permissions for user {}", user_id).bold());
    for code in codes {
        println!("  - {}", code);
    }
}

/// Confirm an action with the user
pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(false)
        .interact()?)
}

pub fn prompt_input(prompt: &str) -> Result<String> {
    Ok(Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?)
}

pub fn prompt_password(prompt: &str) -> Result<String> {
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()?)
}

/// Prompt twice and require both entries to match
pub fn prompt_new_password() -> Result<String> {
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt("New password")
        .with_confirmation("Repeat new password", "Passwords do not match")
        .interact()?)
}
