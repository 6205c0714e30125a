//! What the model is told about each tool.

use merlin_core::provider::ToolDefinition;
use merlin_core::tool::ToolKind;
use serde_json::json;

pub fn description(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::SaveMemory => {
            "Saves a fact about the current user to long-term memory. \
             Use it whenever the user shares something worth remembering."
        }
        ToolKind::RetrieveMemories => {
            "Answers a question from the current user's saved memories. \
             Call it before answering anything the user may have told you earlier. \
             'k' is the number of memories to consult."
        }
        ToolKind::GetExternalProfile => {
            "Retrieves the current user's profile from the parameter service. \
             Use this tool only when you specifically need information from the parameter service, \
             not for the chat profile."
        }
        ToolKind::CreateParameter => {
            "Creates a new parameter the current user wants to track in the parameter service. \
             Only the \"float\" data type is supported."
        }
        ToolKind::ListParameters => {
            "Lists all parameters of the current user from the parameter service."
        }
        ToolKind::CreateMeasurement => {
            "Records a new measurement value for an existing parameter. \
             Use listParameters first if you do not know the parameter id."
        }
        ToolKind::ListMeasurements => {
            "Lists all recorded measurement values for a given parameter."
        }
    }
}

pub fn parameters_schema(kind: ToolKind) -> serde_json::Value {
    match kind {
        ToolKind::SaveMemory => json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "The content of the memory to save." }
            },
            "required": ["content"]
        }),
        ToolKind::RetrieveMemories => json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "The query text to search for relevant memories." },
                "k": { "type": "integer", "description": "The number of memories to retrieve.", "minimum": 1 }
            },
            "required": ["content"]
        }),
        ToolKind::GetExternalProfile | ToolKind::ListParameters => json!({
            "type": "object",
            "properties": {}
        }),
        ToolKind::CreateParameter => json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "The name of the parameter." },
                "description": { "type": "string", "description": "A description for the parameter." },
                "dataType": { "type": "string", "enum": ["float"], "description": "The data type of the parameter." },
                "unit": { "type": "string", "description": "The unit of measurement for the parameter." }
            },
            "required": ["name", "description", "dataType", "unit"]
        }),
        ToolKind::CreateMeasurement => json!({
            "type": "object",
            "properties": {
                "parameterId": { "type": "string", "description": "The ID of the parameter for which the measurement is recorded." },
                "value": { "type": "number", "description": "The measurement value." },
                "notes": { "type": "string", "description": "Any notes or details about the measurement." }
            },
            "required": ["parameterId", "value"]
        }),
        ToolKind::ListMeasurements => json!({
            "type": "object",
            "properties": {
                "parameterId": { "type": "string", "description": "The ID of the parameter whose measurements should be listed." }
            },
            "required": ["parameterId"]
        }),
    }
}

pub fn definition(kind: ToolKind) -> ToolDefinition {
    ToolDefinition {
        name: kind.name().to_string(),
        description: description(kind).to_string(),
        parameters: parameters_schema(kind),
    }
}
