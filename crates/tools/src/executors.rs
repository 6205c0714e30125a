//! Executors: typed arguments in, result text out.
//!
//! Errors returned here are turned into model-visible text by the registry.

use crate::ToolContext;
use crate::invocation::*;
use crate::text_cleaner::TextCleaner;
use merlin_core::error::ToolError;
use merlin_core::structured::{
    ExternalProfile, Measurement, NewMeasurement, NewParameter, Parameter, StructuredDataService,
};
use merlin_core::tool::ToolKind;
use merlin_memory::MemoryService;
use tracing::warn;

const MAX_K: usize = 50;

fn failed(kind: ToolKind, reason: impl ToString) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: kind.name().to_string(),
        reason: reason.to_string(),
    }
}

async fn clean_memory_text(cleaner: Option<&TextCleaner>, text: &str) -> String {
    match cleaner {
        Some(cleaner) => cleaner.extract_memory_text(text).await.unwrap_or_else(|e| {
            warn!(error = %e, "Memory text cleaning failed, using raw text");
            text.to_string()
        }),
        None => text.to_string(),
    }
}

async fn clean_search_query(cleaner: Option<&TextCleaner>, text: &str) -> String {
    match cleaner {
        Some(cleaner) => cleaner.extract_search_query(text).await.unwrap_or_else(|e| {
            warn!(error = %e, "Search query cleaning failed, using raw text");
            text.to_string()
        }),
        None => text.to_string(),
    }
}

pub async fn save_memory(
    memory: &MemoryService,
    cleaner: Option<&TextCleaner>,
    ctx: &ToolContext,
    args: SaveMemoryArgs,
) -> Result<String, ToolError> {
    let content = clean_memory_text(cleaner, &args.content).await;
    memory
        .save_memory(&ctx.user_id, &content, None)
        .await
        .map_err(|e| failed(ToolKind::SaveMemory, e))?;
    Ok("Memory saved successfully!".into())
}

pub async fn retrieve_memories(
    memory: &MemoryService,
    cleaner: Option<&TextCleaner>,
    ctx: &ToolContext,
    args: RetrieveMemoriesArgs,
    default_k: usize,
) -> Result<String, ToolError> {
    let k = args.k.unwrap_or(default_k).clamp(1, MAX_K);
    let query = clean_search_query(cleaner, &args.content).await;
    memory
        .find_relevant_memories(&ctx.user_id, &query, k)
        .await
        .map_err(|e| failed(ToolKind::RetrieveMemories, e))
}

async fn profile(
    service: &dyn StructuredDataService,
    kind: ToolKind,
    ctx: &ToolContext,
) -> Result<ExternalProfile, ToolError> {
    service
        .profile_by_external_id(&ctx.user_id)
        .await
        .map_err(|e| failed(kind, e))
}

/// Fail unless `parameter_id` belongs to the acting user.
async fn owned_parameter(
    service: &dyn StructuredDataService,
    kind: ToolKind,
    ctx: &ToolContext,
    parameter_id: &str,
) -> Result<Parameter, ToolError> {
    let profile = profile(service, kind, ctx).await?;
    let parameters = service
        .list_parameters(&profile.id)
        .await
        .map_err(|e| failed(kind, e))?;
    parameters
        .into_iter()
        .find(|p| p.id == parameter_id)
        .ok_or_else(|| failed(kind, format!("Parameter {parameter_id} not found for your account.")))
}

pub async fn get_external_profile(
    service: &dyn StructuredDataService,
    ctx: &ToolContext,
) -> Result<String, ToolError> {
    let user = profile(service, ToolKind::GetExternalProfile, ctx).await?;
    Ok(format!(
        "User retrieved successfully:\nID: {}\nExternalID: {}\nFirstName: {}\nLastName: {}\nCreated At: {}\nUpdated At: {}",
        user.id, user.external_id, user.first_name, user.last_name, user.created_at, user.updated_at
    ))
}

pub async fn create_parameter(
    service: &dyn StructuredDataService,
    ctx: &ToolContext,
    args: CreateParameterArgs,
) -> Result<String, ToolError> {
    let kind = ToolKind::CreateParameter;
    let owner = profile(service, kind, ctx).await?;
    let parameter = service
        .create_parameter(NewParameter {
            user_id: owner.id,
            name: args.name,
            description: args.description,
            data_type: args.data_type,
            unit: args.unit,
        })
        .await
        .map_err(|e| failed(kind, e))?;

    Ok(format!(
        "Parameter created successfully:\nID: {}\nName: {}\nDataType: float\nUnit: {}",
        parameter.id, parameter.name, parameter.unit
    ))
}

pub async fn list_parameters(
    service: &dyn StructuredDataService,
    ctx: &ToolContext,
) -> Result<String, ToolError> {
    let kind = ToolKind::ListParameters;
    let owner = profile(service, kind, ctx).await?;
    let parameters = service
        .list_parameters(&owner.id)
        .await
        .map_err(|e| failed(kind, e))?;

    if parameters.is_empty() {
        return Ok("No parameters found for your account.".into());
    }

    let list = parameters
        .iter()
        .map(|p| format!("ID: {}, Name: {}, DataType: float, Unit: {}", p.id, p.name, p.unit))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!("Your parameters:\n{list}"))
}

pub async fn create_measurement(
    service: &dyn StructuredDataService,
    ctx: &ToolContext,
    args: CreateMeasurementArgs,
) -> Result<String, ToolError> {
    let kind = ToolKind::CreateMeasurement;
    owned_parameter(service, kind, ctx, &args.parameter_id).await?;
    let m: Measurement = service
        .create_measurement(NewMeasurement {
            parameter_id: args.parameter_id,
            value: args.value,
            notes: args.notes,
        })
        .await
        .map_err(|e| failed(kind, e))?;

    Ok(format!(
        "Measurement created successfully:\nMeasurement ID: {}\nParameter ID: {}\nValue: {}\nTimestamp: {}",
        m.id, m.parameter_id, m.value, m.timestamp
    ))
}

pub async fn list_measurements(
    service: &dyn StructuredDataService,
    ctx: &ToolContext,
    args: ListMeasurementsArgs,
) -> Result<String, ToolError> {
    let kind = ToolKind::ListMeasurements;
    let parameter_id = args.parameter_id;
    owned_parameter(service, kind, ctx, &parameter_id).await?;
    let measurements = service
        .list_measurements(&parameter_id)
        .await
        .map_err(|e| failed(kind, e))?;

    if measurements.is_empty() {
        return Ok(format!("No measurements found for parameter {parameter_id}."));
    }

    let list = measurements
        .iter()
        .map(|m| {
            format!(
                "Measurement ID: {}, Value: {}, Notes: {}, Timestamp: {}",
                m.id,
                m.value,
                m.notes.as_deref().unwrap_or("-"),
                m.timestamp
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!("Measurements for parameter {parameter_id}:\n{list}"))
}
