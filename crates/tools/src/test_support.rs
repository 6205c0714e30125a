//! Scripted doubles shared by this crate's tests.

use async_trait::async_trait;
use merlin_core::error::{ProviderError, StructuredDataError};
use merlin_core::message::ChatMessage;
use merlin_core::provider::*;
use merlin_core::structured::*;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Deterministic embedding: lowercase words hashed into 64 buckets.
pub fn hashed_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 64];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
            % 63;
        v[bucket] += 1.0;
    }
    v[63] = 0.01;
    v
}

/// Answers completions from a fixed script; embeds with [`hashed_embedding`].
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ProviderRequest>>,
    embedded: Mutex<Vec<String>>,
    fail_embeddings: bool,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            requests: Mutex::new(Vec::new()),
            embedded: Mutex::new(Vec::new()),
            fail_embeddings: false,
        }
    }

    pub fn failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn embedded(&self) -> Vec<String> {
        self.embedded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::Network("script exhausted".into()))?;
        Ok(ProviderResponse {
            message: ChatMessage::assistant(reply),
            usage: None,
            model,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        if self.fail_embeddings {
            return Err(ProviderError::Network("embedding endpoint unreachable".into()));
        }
        self.embedded.lock().unwrap().extend(request.inputs.iter().cloned());
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| hashed_embedding(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// In-process structured-data service that knows exactly one linked user.
pub struct FakeStructuredData {
    external_id: String,
    lookups: Mutex<Vec<String>>,
    parameters: Mutex<Vec<Parameter>>,
    measurements: Mutex<Vec<Measurement>>,
}

impl FakeStructuredData {
    pub fn new(external_id: &str) -> Self {
        Self {
            external_id: external_id.into(),
            lookups: Mutex::new(Vec::new()),
            parameters: Mutex::new(Vec::new()),
            measurements: Mutex::new(Vec::new()),
        }
    }

    /// Ids passed to `profile_by_external_id`, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

const STAMP: &str = "2025-01-01T00:00:00Z";

#[async_trait]
impl StructuredDataService for FakeStructuredData {
    async fn profile_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<ExternalProfile, StructuredDataError> {
        self.lookups.lock().unwrap().push(external_id.to_string());
        if external_id != self.external_id {
            return Err(StructuredDataError::Api {
                url: format!("https://fake.test/api/users/external/{external_id}"),
                status: 404,
                body: "{\"message\":\"User not found\"}".into(),
            });
        }
        Ok(ExternalProfile {
            id: "svc-user-1".into(),
            external_id: external_id.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            created_at: STAMP.into(),
            updated_at: STAMP.into(),
        })
    }

    async fn create_parameter(&self, input: NewParameter) -> Result<Parameter, StructuredDataError> {
        let mut parameters = self.parameters.lock().unwrap();
        let parameter = Parameter {
            id: format!("p{}", parameters.len() + 1),
            user_id: input.user_id,
            name: input.name,
            description: input.description,
            data_type: input.data_type,
            unit: input.unit,
            created_at: STAMP.into(),
            updated_at: STAMP.into(),
        };
        parameters.push(parameter.clone());
        Ok(parameter)
    }

    async fn list_parameters(&self, user_id: &str) -> Result<Vec<Parameter>, StructuredDataError> {
        Ok(self
            .parameters
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_measurement(
        &self,
        input: NewMeasurement,
    ) -> Result<Measurement, StructuredDataError> {
        let mut measurements = self.measurements.lock().unwrap();
        let measurement = Measurement {
            kind: DataType::Float,
            id: format!("m{}", measurements.len() + 1),
            user_id: "svc-user-1".into(),
            parameter_id: input.parameter_id,
            value: input.value,
            timestamp: STAMP.into(),
            notes: input.notes,
            created_at: STAMP.into(),
            updated_at: STAMP.into(),
        };
        measurements.push(measurement.clone());
        Ok(measurement)
    }

    async fn list_measurements(
        &self,
        parameter_id: &str,
    ) -> Result<Vec<Measurement>, StructuredDataError> {
        Ok(self
            .measurements
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.parameter_id == parameter_id)
            .cloned()
            .collect())
    }
}
