use crate::error::ContractError;
use crate::spec::document::OpenApiDocument;
use serde_json::Value;
use std::fs::File;
use std::path::Path;

/// Loads an OpenAPI document from a YAML or JSON file.
pub fn load_document(path: &Path) -> Result<OpenApiDocument, ContractError> {
    let file = File::open(path)
        .map_err(|e| ContractError::Load(format!("Failed to open spec file: {}", e)))?;

    let yaml: serde_yaml::Value = serde_yaml::from_reader(file)
        .map_err(|e| ContractError::Load(format!("Failed to parse OpenAPI spec: {}", e)))?;
    log::debug!("loaded OpenAPI document from {}", path.display());

    OpenApiDocument::from_value(yaml_to_json(yaml)?)
}

/// Parses an OpenAPI document held in memory. JSON is a subset of YAML, so
/// both are accepted.
pub fn parse_document(source: &str) -> Result<OpenApiDocument, ContractError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(source)
        .map_err(|e| ContractError::Load(format!("Failed to parse OpenAPI spec: {}", e)))?;
    OpenApiDocument::from_value(yaml_to_json(yaml)?)
}

/// Non-string mapping keys (e.g. `200:` under `responses`) become strings.
fn yaml_to_json(yaml: serde_yaml::Value) -> Result<Value, ContractError> {
    serde_json::to_value(yaml)
        .map_err(|e| ContractError::Load(format!("Document is not representable as JSON: {}", e)))
}
