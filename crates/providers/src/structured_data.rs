//! Signed REST client for the parameter/measurement service.
//!
//! Every request carries `X-Timestamp` (unix seconds) and `X-Signature`,
//! the base64 HMAC-SHA256 of `"{body}|{timestamp}"` keyed with the API key.
//! GET requests sign an empty body.

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use merlin_config::StructuredDataConfig;
use merlin_core::error::StructuredDataError;
use merlin_core::structured::*;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub struct CorrelateClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl CorrelateClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, StructuredDataError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StructuredDataError::Client(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from the `[structured_data]` config section. Returns `None`
    /// when no signing key is configured.
    pub fn from_config(config: &StructuredDataConfig) -> Result<Option<Self>, StructuredDataError> {
        config
            .api_key
            .as_ref()
            .map(|key| Self::new(config.base_url.clone(), key.clone()))
            .transpose()
    }

    /// Compute the request signature for a body at a given timestamp.
    pub fn sign(&self, body: &str, timestamp: i64) -> String {
        let mut mac = match HmacSha256::new_from_slice(self.api_key.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(format!("{body}|{timestamp}").as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StructuredDataError> {
        self.send(reqwest::Method::GET, path, String::new()).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StructuredDataError> {
        let url = format!("{}{}", self.base_url, path);
        let body = serde_json::to_string(body).map_err(|e| StructuredDataError::InvalidResponse {
            url,
            reason: format!("request body: {e}"),
        })?;
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: String,
    ) -> Result<T, StructuredDataError> {
        let url = format!("{}{}", self.base_url, path);
        let timestamp = chrono::Utc::now().timestamp();
        let signature = self.sign(&body, timestamp);

        debug!(%method, %url, "Structured data request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("X-Timestamp", timestamp.to_string())
            .header("X-Signature", signature);
        if method == reqwest::Method::POST {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|_| StructuredDataError::Network { url: url.clone() })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status, %url, "Structured data service returned error");
            return Err(StructuredDataError::Api { url, status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StructuredDataError::InvalidResponse {
                url,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl StructuredDataService for CorrelateClient {
    async fn profile_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<ExternalProfile, StructuredDataError> {
        self.get(&format!("/api/users/external/{external_id}")).await
    }

    async fn create_parameter(&self, input: NewParameter) -> Result<Parameter, StructuredDataError> {
        self.post("/api/parameters", &input).await
    }

    async fn list_parameters(&self, user_id: &str) -> Result<Vec<Parameter>, StructuredDataError> {
        self.get(&format!("/api/parameters/user/{user_id}")).await
    }

    async fn create_measurement(
        &self,
        input: NewMeasurement,
    ) -> Result<Measurement, StructuredDataError> {
        self.post("/api/measurements", &input).await
    }

    async fn list_measurements(
        &self,
        parameter_id: &str,
    ) -> Result<Vec<Measurement>, StructuredDataError> {
        self.get(&format!("/api/measurements/parameter/{parameter_id}"))
            .await
    }
}
