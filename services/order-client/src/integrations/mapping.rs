use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{HttpClientError, ServiceClient};
use thiserror::Error;

use crate::domain::location::Coordinates;
use crate::domain::route::{RouteRequest, RouteResponse};

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Mapping gateway error: {0}")]
    Gateway(#[from] HttpClientError),

    #[error("Alamat tidak ditemukan")]
    NotFound,

    #[error("Response mapping tidak valid: {0}")]
    InvalidResponse(String),
}

/// Layanan peta: rute, geocode titik ke alamat, dan alamat ke titik.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MappingProvider: Send + Sync {
    async fn compute_route(&self, request: RouteRequest) -> Result<RouteResponse, MappingError>;

    async fn geocode(&self, point: Coordinates) -> Result<String, MappingError>;

    async fn reverse_geocode(&self, address: String) -> Result<Coordinates, MappingError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default, alias = "formatted_address", alias = "formattedAddress")]
    address: Option<String>,
}

#[derive(Debug, Serialize)]
struct AddressQuery<'a> {
    address: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    #[serde(default)]
    location: Option<Coordinates>,
}

// Gateway peta lewat HTTP JSON
pub struct HttpMappingProvider {
    client: ServiceClient,
}

impl HttpMappingProvider {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MappingProvider for HttpMappingProvider {
    async fn compute_route(&self, request: RouteRequest) -> Result<RouteResponse, MappingError> {
        Ok(self.client.post("/routes/compute", &request, None).await?)
    }

    async fn geocode(&self, point: Coordinates) -> Result<String, MappingError> {
        let response: GeocodeResponse = self.client.post("/geocode", &point, None).await?;

        response
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or(MappingError::NotFound)
    }

    async fn reverse_geocode(&self, address: String) -> Result<Coordinates, MappingError> {
        let response: ReverseGeocodeResponse = self
            .client
            .post("/geocode/reverse", &AddressQuery { address: &address }, None)
            .await?;

        let point = match (response.location, response.lat, response.lng) {
            (Some(location), _, _) => location,
            (None, Some(lat), Some(lng)) => Coordinates::new(lat, lng),
            _ => return Err(MappingError::NotFound),
        };

        if !point.is_valid() {
            return Err(MappingError::InvalidResponse(format!(
                "koordinat tidak valid untuk '{}'",
                address
            )));
        }

        Ok(point)
    }
}
