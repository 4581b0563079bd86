//! Locations, tanks and permits

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::Resource;

/// A site holding tanks and permits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Resource for Location {
    const PATH: &'static str = "/facilities/locations/";
    const NAME: &'static str = "location";
    type Create = NewLocation;
    type Update = LocationUpdate;

    fn id(&self) -> i64 {
        self.id
    }
}

impl Location {
    pub fn full_address(&self) -> String {
        [self.address.as_str(), self.city.as_str(), self.state.as_str(), self.zip_code.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TankStatus {
    #[default]
    Active,
    Inactive,
    Closed,
    #[serde(other)]
    Other,
}

impl fmt::Display for TankStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TankStatus::Active => write!(f, "active"),
            TankStatus::Inactive => write!(f, "inactive"),
            TankStatus::Closed => write!(f, "closed"),
            TankStatus::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for TankStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(TankStatus::Active),
            "inactive" => Ok(TankStatus::Inactive),
            "closed" => Ok(TankStatus::Closed),
            other => Err(format!("unknown tank status '{}'", other)),
        }
    }
}

/// A storage tank at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    pub id: i64,
    /// Owning location id
    pub location: i64,
    pub tank_number: String,
    #[serde(default)]
    pub product: String,
    /// Capacity in gallons
    #[serde(default)]
    pub capacity: f64,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub installed_on: Option<NaiveDate>,
    #[serde(default)]
    pub status: TankStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTank {
    pub location: i64,
    pub tank_number: String,
    pub product: String,
    pub capacity: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub material: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TankStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TankUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tank_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TankStatus>,
}

impl Resource for Tank {
    const PATH: &'static str = "/facilities/tanks/";
    const NAME: &'static str = "tank";
    type Create = NewTank;
    type Update = TankUpdate;

    fn id(&self) -> i64 {
        self.id
    }
}

/// A regulatory permit held by a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permit {
    pub id: i64,
    pub location: i64,
    pub permit_number: String,
    #[serde(default)]
    pub permit_type: String,
    #[serde(default)]
    pub issuing_authority: String,
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    #[serde(default)]
    pub status: String,
}

impl Permit {
    /// A permit without an expiry date never expires
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_on.is_some_and(|date| date < today)
    }

    /// Not yet expired, but expiring within `days` of `today`
    pub fn expires_within(&self, today: NaiveDate, days: i64) -> bool {
        self.expires_on
            .is_some_and(|date| date >= today && (date - today).num_days() <= days)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPermit {
    pub location: i64,
    pub permit_number: String,
    pub permit_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issuing_authority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermitUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Resource for Permit {
    const PATH: &'static str = "/facilities/permits/";
    const NAME: &'static str = "permit";
    type Create = NewPermit;
    type Update = PermitUpdate;

    fn id(&self) -> i64 {
        self.id
    }
}
