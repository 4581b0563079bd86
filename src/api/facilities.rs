//! `/facilities/` endpoints

use super::client::ApiClient;
use crate::error::Result;
use crate::facilities::{
    Location, LocationUpdate, NewLocation, NewPermit, NewTank, Permit, PermitUpdate, Tank,
    TankUpdate,
};

fn location_filter(location: Option<i64>) -> Vec<(&'static str, String)> {
    location
        .map(|id| vec![("location", id.to_string())])
        .unwrap_or_default()
}

impl ApiClient {
    pub async fn get_locations(&self) -> Result<Vec<Location>> {
        self.list::<Location>(&[]).await
    }

    pub async fn get_location(&self, id: i64) -> Result<Location> {
        self.get::<Location>(id).await
    }

    pub async fn create_location(&self, location: &NewLocation) -> Result<Location> {
        self.create::<Location>(location).await
    }

    pub async fn update_location(&self, id: i64, update: &LocationUpdate) -> Result<Location> {
        self.update::<Location>(id, update).await
    }

    pub async fn delete_location(&self, id: i64) -> Result<()> {
        self.delete::<Location>(id).await
    }

    /// Tanks, optionally only those at one location
    pub async fn get_tanks(&self, location: Option<i64>) -> Result<Vec<Tank>> {
        self.list::<Tank>(&location_filter(location)).await
    }

    pub async fn get_tank(&self, id: i64) -> Result<Tank> {
        self.get::<Tank>(id).await
    }

    pub async fn create_tank(&self, tank: &NewTank) -> Result<Tank> {
        self.create::<Tank>(tank).await
    }

    pub async fn update_tank(&self, id: i64, update: &TankUpdate) -> Result<Tank> {
        self.update::<Tank>(id, update).await
    }

    pub async fn delete_tank(&self, id: i64) -> Result<()> {
        self.delete::<Tank>(id).await
    }

    /// Permits, optionally only those held by one location
    pub async fn get_permits(&self, location: Option<i64>) -> Result<Vec<Permit>> {
        self.list::<Permit>(&location_filter(location)).await
    }

    pub async fn get_permit(&self, id: i64) -> Result<Permit> {
        self.get::<Permit>(id).await
    }

    pub async fn create_permit(&self, permit: &NewPermit) -> Result<Permit> {
        self.create::<Permit>(permit).await
    }

    pub async fn update_permit(&self, id: i64, update: &PermitUpdate) -> Result<Permit> {
        self.update::<Permit>(id, update).await
    }

    pub async fn delete_permit(&self, id: i64) -> Result<()> {
        self.delete::<Permit>(id).await
    }
}
