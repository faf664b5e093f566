use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value carried by a tunable parameter. The server mixes booleans, integers,
/// floats and strings in one schema, so the wire representation is untagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Float,
    Boolean,
    #[default]
    Number,
}

/// One parameter entry as the server sends it. The loading-parameter endpoint
/// carries `default`; the inference-parameter endpoint carries both `current`
/// and `default`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParameterSpec {
    pub current: Option<ParamValue>,
    pub default: Option<ParamValue>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    /// Normalize into a [`ParameterSchema`]. The server's `current` value
    /// wins over `default` when both are present: the original client seeds
    /// its editable values from what the model is actually running with.
    /// Entries carrying neither are unusable and dropped.
    pub fn into_schema(self, name: &str) -> Option<ParameterSchema> {
        let default_value = self.current.or(self.default)?;
        Some(ParameterSchema {
            name: name.to_string(),
            default_value,
            min: self.min,
            max: self.max,
            value_type: self.value_type,
            description: self.description,
        })
    }
}

/// Server-declared description of one tunable parameter, immutable once
/// fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    pub name: String,
    pub default_value: ParamValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub value_type: ValueType,
    pub description: String,
}

/// Normalized name -> schema map for one parameter family.
pub type SchemaSet = HashMap<String, ParameterSchema>;

/// `GET /model/loading-parameters` payload: global defaults plus optional
/// per-model sections that override same-named globals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadingParametersResponse {
    #[serde(default)]
    pub global_defaults: HashMap<String, ParameterSpec>,
    #[serde(default)]
    pub model_specific: HashMap<String, HashMap<String, ParameterSpec>>,
}

impl LoadingParametersResponse {
    /// Merged schema for a model: globals first, then model-specific entries
    /// override by name.
    pub fn schema_for(&self, model: Option<&str>) -> SchemaSet {
        let mut schemas = SchemaSet::new();
        for (name, spec) in &self.global_defaults {
            if let Some(schema) = spec.clone().into_schema(name) {
                schemas.insert(name.clone(), schema);
            }
        }
        if let Some(model) = model {
            if let Some(specific) = self.model_specific.get(model) {
                for (name, spec) in specific {
                    if let Some(schema) = spec.clone().into_schema(name) {
                        schemas.insert(name.clone(), schema);
                    }
                }
            }
        }
        schemas
    }
}

/// `GET /model/inference-parameters` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InferenceParametersResponse {
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, ParameterSpec>,
}

impl InferenceParametersResponse {
    pub fn schema(&self) -> SchemaSet {
        let mut schemas = SchemaSet::new();
        for (name, spec) in &self.parameters {
            if let Some(schema) = spec.clone().into_schema(name) {
                schemas.insert(name.clone(), schema);
            }
        }
        schemas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_decoding() {
        let v: ParamValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, ParamValue::Bool(true));

        let v: ParamValue = serde_json::from_str("2048").unwrap();
        assert_eq!(v, ParamValue::Int(2048));

        let v: ParamValue = serde_json::from_str("0.8").unwrap();
        assert_eq!(v, ParamValue::Float(0.8));

        let v: ParamValue = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(v, ParamValue::Text("auto".to_string()));
    }

    #[test]
    fn test_loading_schema_merge_prefers_model_specific() {
        let json = r#"{
            "global_defaults": {
                "n_ctx": {"default": 2048, "min": 512, "max": 8192, "type": "integer", "description": "context window"},
                "use_mmap": {"default": true, "type": "boolean", "description": ""}
            },
            "model_specific": {
                "llama-7b": {
                    "n_ctx": {"default": 4096, "min": 512, "max": 8192, "type": "integer", "description": "context window"}
                }
            }
        }"#;
        let response: LoadingParametersResponse = serde_json::from_str(json).unwrap();

        let merged = response.schema_for(Some("llama-7b"));
        assert_eq!(merged["n_ctx"].default_value, ParamValue::Int(4096));
        assert_eq!(merged["use_mmap"].default_value, ParamValue::Bool(true));

        let global_only = response.schema_for(Some("mistral-7b"));
        assert_eq!(global_only["n_ctx"].default_value, ParamValue::Int(2048));

        let no_model = response.schema_for(None);
        assert_eq!(no_model["n_ctx"].default_value, ParamValue::Int(2048));
    }

    #[test]
    fn test_inference_schema_seeds_from_current() {
        let json = r#"{
            "model": "llama-7b",
            "parameters": {
                "temperature": {"current": 0.9, "default": 0.8, "min": 0.0, "max": 2.0, "type": "float", "description": "sampling temperature"},
                "top_k": {"default": 40, "type": "integer"}
            }
        }"#;
        let response: InferenceParametersResponse = serde_json::from_str(json).unwrap();
        let schemas = response.schema();

        assert_eq!(
            schemas["temperature"].default_value,
            ParamValue::Float(0.9)
        );
        assert_eq!(schemas["top_k"].default_value, ParamValue::Int(40));
    }

    #[test]
    fn test_entry_without_any_value_is_dropped() {
        let json = r#"{
            "parameters": {
                "mystery": {"type": "float", "description": "no value at all"}
            }
        }"#;
        let response: InferenceParametersResponse = serde_json::from_str(json).unwrap();
        assert!(response.schema().is_empty());
    }
}
