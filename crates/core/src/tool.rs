//! Tool catalog types.
//!
//! The catalog is closed: every capability the reasoning loop may call is a
//! variant of [`ToolKind`]. Tool names coming back from the model are
//! resolved to a variant once, and the registry dispatches on the variant, so
//! adding a tool without an executor is a compile error rather than a runtime
//! lookup miss.

use serde::{Deserialize, Serialize};

/// Every tool the agent can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "saveMemory")]
    SaveMemory,
    #[serde(rename = "retrieveMemories")]
    RetrieveMemories,
    #[serde(rename = "getExternalProfile")]
    GetExternalProfile,
    #[serde(rename = "createParameter")]
    CreateParameter,
    #[serde(rename = "listParameters")]
    ListParameters,
    #[serde(rename = "createMeasurement")]
    CreateMeasurement,
    #[serde(rename = "listMeasurements")]
    ListMeasurements,
}

impl ToolKind {
    /// The full catalog, in the order it is offered to the model.
    pub const ALL: [ToolKind; 7] = [
        ToolKind::SaveMemory,
        ToolKind::RetrieveMemories,
        ToolKind::GetExternalProfile,
        ToolKind::CreateParameter,
        ToolKind::ListParameters,
        ToolKind::CreateMeasurement,
        ToolKind::ListMeasurements,
    ];

    /// The wire name the model uses to call this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::SaveMemory => "saveMemory",
            ToolKind::RetrieveMemories => "retrieveMemories",
            ToolKind::GetExternalProfile => "getExternalProfile",
            ToolKind::CreateParameter => "createParameter",
            ToolKind::ListParameters => "listParameters",
            ToolKind::CreateMeasurement => "createMeasurement",
            ToolKind::ListMeasurements => "listMeasurements",
        }
    }

    /// Resolve a wire name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A request to execute a tool, as proposed by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution. Always text; failures included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// The resolved tool, if the name matched the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ToolKind>,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The text handed back to the model
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_lookup() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(ToolKind::from_name("shell"), None);
        assert_eq!(ToolKind::from_name("SaveMemory"), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ToolKind::ListMeasurements).unwrap();
        assert_eq!(json, "\"listMeasurements\"");
    }
}
