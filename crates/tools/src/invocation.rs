//! Typed arguments for every catalog entry.
//!
//! The model's JSON arguments are decoded once into a [`ToolInvocation`];
//! executors only ever see the typed record. The acting user never comes
//! from here: it is taken from the turn's [`ToolContext`](crate::ToolContext).

use merlin_core::error::ToolError;
use merlin_core::structured::DataType;
use merlin_core::tool::ToolKind;
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaveMemoryArgs {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrieveMemoriesArgs {
    /// The question or search text
    #[serde(alias = "query")]
    pub content: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParameterArgs {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub data_type: DataType,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeasurementArgs {
    pub parameter_id: String,
    pub value: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeasurementsArgs {
    pub parameter_id: String,
}

/// One decoded tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    SaveMemory(SaveMemoryArgs),
    RetrieveMemories(RetrieveMemoriesArgs),
    GetExternalProfile,
    CreateParameter(CreateParameterArgs),
    ListParameters,
    CreateMeasurement(CreateMeasurementArgs),
    ListMeasurements(ListMeasurementsArgs),
}

fn decode<T: DeserializeOwned>(arguments: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

impl ToolInvocation {
    pub fn parse(kind: ToolKind, arguments: serde_json::Value) -> Result<Self, ToolError> {
        Ok(match kind {
            ToolKind::SaveMemory => Self::SaveMemory(decode(arguments)?),
            ToolKind::RetrieveMemories => Self::RetrieveMemories(decode(arguments)?),
            ToolKind::GetExternalProfile => Self::GetExternalProfile,
            ToolKind::CreateParameter => Self::CreateParameter(decode(arguments)?),
            ToolKind::ListParameters => Self::ListParameters,
            ToolKind::CreateMeasurement => Self::CreateMeasurement(decode(arguments)?),
            ToolKind::ListMeasurements => Self::ListMeasurements(decode(arguments)?),
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::SaveMemory(_) => ToolKind::SaveMemory,
            Self::RetrieveMemories(_) => ToolKind::RetrieveMemories,
            Self::GetExternalProfile => ToolKind::GetExternalProfile,
            Self::CreateParameter(_) => ToolKind::CreateParameter,
            Self::ListParameters => ToolKind::ListParameters,
            Self::CreateMeasurement(_) => ToolKind::CreateMeasurement,
            Self::ListMeasurements(_) => ToolKind::ListMeasurements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_supplied_user_id_is_ignored() {
        let inv = ToolInvocation::parse(
            ToolKind::SaveMemory,
            json!({"userId": "someone-else", "content": "I like tea"}),
        )
        .unwrap();
        assert_eq!(
            inv,
            ToolInvocation::SaveMemory(SaveMemoryArgs {
                content: "I like tea".into()
            })
        );
    }

    #[test]
    fn retrieve_accepts_query_alias_and_optional_k() {
        let inv = ToolInvocation::parse(ToolKind::RetrieveMemories, json!({"query": "tea"})).unwrap();
        let ToolInvocation::RetrieveMemories(args) = inv else {
            panic!("wrong variant");
        };
        assert_eq!(args.content, "tea");
        assert_eq!(args.k, None);
    }

    #[test]
    fn missing_required_field_is_invalid_arguments() {
        let err = ToolInvocation::parse(ToolKind::CreateMeasurement, json!({"parameterId": "p1"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn only_float_parameters_are_accepted() {
        let args = json!({"name": "mood", "description": "d", "dataType": "string", "unit": ""});
        assert!(ToolInvocation::parse(ToolKind::CreateParameter, args).is_err());

        let args = json!({"name": "weight", "description": "Body weight", "unit": "kg"});
        let inv = ToolInvocation::parse(ToolKind::CreateParameter, args).unwrap();
        assert_eq!(inv.kind(), ToolKind::CreateParameter);
    }

    #[test]
    fn argument_free_tools_ignore_payload() {
        let inv = ToolInvocation::parse(ToolKind::ListParameters, serde_json::Value::Null).unwrap();
        assert_eq!(inv, ToolInvocation::ListParameters);
    }
}
