//! Parameters and measurements kept by the external structured-data service.
//!
//! A parameter is something a user tracks (weight, sleep hours); a
//! measurement is one recorded value for a parameter.

use crate::error::StructuredDataError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The only data type the service supports today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Float,
}

/// A user record as the structured-data service knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfile {
    pub id: String,
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub data_type: DataType,
    pub unit: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParameter {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub data_type: DataType,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    #[serde(rename = "type")]
    pub kind: DataType,
    pub id: String,
    pub user_id: String,
    pub parameter_id: String,
    pub value: f64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeasurement {
    pub parameter_id: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Client side of the structured-data REST service.
#[async_trait]
pub trait StructuredDataService: Send + Sync {
    async fn profile_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<ExternalProfile, StructuredDataError>;

    async fn create_parameter(&self, input: NewParameter) -> Result<Parameter, StructuredDataError>;

    async fn list_parameters(&self, user_id: &str) -> Result<Vec<Parameter>, StructuredDataError>;

    async fn create_measurement(
        &self,
        input: NewMeasurement,
    ) -> Result<Measurement, StructuredDataError>;

    async fn list_measurements(
        &self,
        parameter_id: &str,
    ) -> Result<Vec<Measurement>, StructuredDataError>;
}
