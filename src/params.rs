use crate::error::{LlmError, Result};
use crate::models::{
    InferenceParametersResponse, LoadingParametersResponse, ParamValue, SchemaSet,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Which of the two parallel parameter families an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// Parameters sent with `/model/load`.
    Loading,
    /// Sampling parameters sent with `/query`.
    Inference,
}

/// Client-side state for the two tunable parameter families.
///
/// Each family holds a server-provided schema (cached until the server URL
/// changes) and an override map that is empty until the user edits a value;
/// reads fall back to schema defaults. Override maps are rebuilt and swapped
/// on every change, so a snapshot handed to an in-flight request never
/// mutates underneath it.
///
/// Not internally synchronized: the store expects a single logical owner
/// (the session). Only snapshots cross task boundaries.
#[derive(Debug, Default)]
pub struct ParameterStore {
    loading_schema: Option<LoadingParametersResponse>,
    inference_schema: Option<InferenceParametersResponse>,
    loading_overrides: Arc<HashMap<String, ParamValue>>,
    inference_overrides: Arc<HashMap<String, ParamValue>>,
    selected_model: Option<String>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    /// Record the model the user is working with. Switching to a genuinely
    /// different model clears both override maps; re-selecting the current
    /// model preserves them.
    pub fn select_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        if self.selected_model.as_deref() == Some(model.as_str()) {
            return;
        }
        log::debug!("Model selection changed to '{}', clearing overrides", model);
        self.selected_model = Some(model);
        self.loading_overrides = Arc::new(HashMap::new());
        self.inference_overrides = Arc::new(HashMap::new());
    }

    /// Store a fetched loading-parameter schema. Seeds the override map with
    /// defaults only when it is currently empty; edited or restored values
    /// are left untouched.
    pub fn ingest_loading_schema(&mut self, response: LoadingParametersResponse) {
        self.loading_schema = Some(response);
        if self.loading_overrides.is_empty() {
            self.reset_to_defaults(ParameterKind::Loading, None);
        }
    }

    /// Store a fetched inference-parameter schema; same seeding rule.
    pub fn ingest_inference_schema(&mut self, response: InferenceParametersResponse) {
        self.inference_schema = Some(response);
        if self.inference_overrides.is_empty() {
            self.reset_to_defaults(ParameterKind::Inference, None);
        }
    }

    pub fn has_schema(&self, kind: ParameterKind) -> bool {
        match kind {
            ParameterKind::Loading => self.loading_schema.is_some(),
            ParameterKind::Inference => self.inference_schema.is_some(),
        }
    }

    /// Merged schema for a family: loading schemas merge global defaults with
    /// per-model entries (model wins); inference schemas are flat.
    pub fn schema(&self, kind: ParameterKind, model: Option<&str>) -> SchemaSet {
        let model = model.or(self.selected_model.as_deref());
        match kind {
            ParameterKind::Loading => self
                .loading_schema
                .as_ref()
                .map(|s| s.schema_for(model))
                .unwrap_or_default(),
            ParameterKind::Inference => self
                .inference_schema
                .as_ref()
                .map(|s| s.schema())
                .unwrap_or_default(),
        }
    }

    /// Replace the override map with a copy containing the updated entry.
    pub fn set_override(&mut self, kind: ParameterKind, name: impl Into<String>, value: ParamValue) {
        let slot = self.overrides_mut(kind);
        let mut next: HashMap<String, ParamValue> = slot.as_ref().clone();
        next.insert(name.into(), value);
        *slot = Arc::new(next);
    }

    /// Snapshot of the current override map, cheap to hand to request tasks.
    pub fn overrides(&self, kind: ParameterKind) -> Arc<HashMap<String, ParamValue>> {
        match kind {
            ParameterKind::Loading => Arc::clone(&self.loading_overrides),
            ParameterKind::Inference => Arc::clone(&self.inference_overrides),
        }
    }

    /// Override if present, else schema default. A name known to neither map
    /// is a caller bug, surfaced as [`LlmError::UnknownParameter`].
    pub fn effective_value(&self, kind: ParameterKind, name: &str) -> Result<ParamValue> {
        if let Some(value) = self.overrides_ref(kind).get(name) {
            return Ok(value.clone());
        }
        self.schema(kind, None)
            .get(name)
            .map(|schema| schema.default_value.clone())
            .ok_or_else(|| LlmError::UnknownParameter(name.to_string()))
    }

    /// Discard the whole override map for a family and repopulate it from
    /// schema defaults for the given model. There is no partial reset.
    pub fn reset_to_defaults(&mut self, kind: ParameterKind, model: Option<&str>) {
        let defaults: HashMap<String, ParamValue> = self
            .schema(kind, model)
            .into_iter()
            .map(|(name, schema)| (name, schema.default_value))
            .collect();
        *self.overrides_mut(kind) = Arc::new(defaults);
    }

    /// Names whose effective value differs from the schema default. An
    /// override explicitly set back to the default does not count.
    pub fn changed_parameter_names(&self, kind: ParameterKind) -> HashSet<String> {
        let overrides = self.overrides_ref(kind);
        self.schema(kind, None)
            .into_iter()
            .filter(|(name, schema)| {
                overrides
                    .get(name)
                    .map(|value| *value != schema.default_value)
                    .unwrap_or(false)
            })
            .map(|(name, _)| name)
            .collect()
    }

    /// Drop cached schemas and overrides, e.g. when the server URL changes.
    pub fn clear(&mut self) {
        self.loading_schema = None;
        self.inference_schema = None;
        self.loading_overrides = Arc::new(HashMap::new());
        self.inference_overrides = Arc::new(HashMap::new());
        self.selected_model = None;
    }

    fn overrides_ref(&self, kind: ParameterKind) -> &HashMap<String, ParamValue> {
        match kind {
            ParameterKind::Loading => &self.loading_overrides,
            ParameterKind::Inference => &self.inference_overrides,
        }
    }

    fn overrides_mut(&mut self, kind: ParameterKind) -> &mut Arc<HashMap<String, ParamValue>> {
        match kind {
            ParameterKind::Loading => &mut self.loading_overrides,
            ParameterKind::Inference => &mut self.inference_overrides,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inference_schema(entries: &[(&str, f64)]) -> InferenceParametersResponse {
        let parameters = entries
            .iter()
            .map(|(name, default)| {
                let spec = serde_json::from_value(serde_json::json!({
                    "current": default,
                    "default": default,
                    "type": "float",
                    "description": ""
                }))
                .unwrap();
                (name.to_string(), spec)
            })
            .collect();
        InferenceParametersResponse {
            model: None,
            parameters,
        }
    }

    fn loading_schema() -> LoadingParametersResponse {
        serde_json::from_value(serde_json::json!({
            "global_defaults": {
                "n_ctx": {"default": 2048, "type": "integer", "description": ""},
                "use_mmap": {"default": true, "type": "boolean", "description": ""}
            },
            "model_specific": {
                "model-b": {
                    "n_ctx": {"default": 8192, "type": "integer", "description": ""}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_effective_value_prefers_override() {
        let mut store = ParameterStore::new();
        store.ingest_inference_schema(inference_schema(&[("temperature", 0.8)]));

        assert_eq!(
            store
                .effective_value(ParameterKind::Inference, "temperature")
                .unwrap(),
            ParamValue::Float(0.8)
        );

        store.set_override(
            ParameterKind::Inference,
            "temperature",
            ParamValue::Float(0.9),
        );
        assert_eq!(
            store
                .effective_value(ParameterKind::Inference, "temperature")
                .unwrap(),
            ParamValue::Float(0.9)
        );
    }

    #[test]
    fn test_unknown_parameter_is_an_error() {
        let store = ParameterStore::new();
        assert!(matches!(
            store.effective_value(ParameterKind::Inference, "nonsense"),
            Err(LlmError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_first_fetch_seeds_empty_overrides_only() {
        let mut store = ParameterStore::new();
        store.ingest_inference_schema(inference_schema(&[("temperature", 0.8)]));
        assert_eq!(store.overrides(ParameterKind::Inference).len(), 1);

        store.set_override(
            ParameterKind::Inference,
            "temperature",
            ParamValue::Float(1.2),
        );
        // A refetch must not clobber edited values.
        store.ingest_inference_schema(inference_schema(&[("temperature", 0.8)]));
        assert_eq!(
            store
                .effective_value(ParameterKind::Inference, "temperature")
                .unwrap(),
            ParamValue::Float(1.2)
        );
    }

    #[test]
    fn test_reset_restores_defaults_regardless_of_prior_content() {
        let mut store = ParameterStore::new();
        store.ingest_inference_schema(inference_schema(&[("temperature", 0.8), ("top_p", 0.9)]));
        store.set_override(
            ParameterKind::Inference,
            "temperature",
            ParamValue::Float(1.5),
        );
        store.set_override(ParameterKind::Inference, "top_p", ParamValue::Float(0.1));

        store.reset_to_defaults(ParameterKind::Inference, None);

        for (name, default) in [("temperature", 0.8), ("top_p", 0.9)] {
            assert_eq!(
                store
                    .effective_value(ParameterKind::Inference, name)
                    .unwrap(),
                ParamValue::Float(default)
            );
        }
        assert!(store
            .changed_parameter_names(ParameterKind::Inference)
            .is_empty());
    }

    #[test]
    fn test_changed_set_compares_against_schema_default() {
        let mut store = ParameterStore::new();
        store.ingest_inference_schema(inference_schema(&[("temperature", 0.8)]));

        // Explicitly set to the default: not changed.
        store.set_override(
            ParameterKind::Inference,
            "temperature",
            ParamValue::Float(0.8),
        );
        assert!(store
            .changed_parameter_names(ParameterKind::Inference)
            .is_empty());

        store.set_override(
            ParameterKind::Inference,
            "temperature",
            ParamValue::Float(0.9),
        );
        let changed = store.changed_parameter_names(ParameterKind::Inference);
        assert_eq!(changed.len(), 1);
        assert!(changed.contains("temperature"));
    }

    #[test]
    fn test_copy_on_write_snapshots_are_stable() {
        let mut store = ParameterStore::new();
        store.ingest_inference_schema(inference_schema(&[("temperature", 0.8)]));

        let before = store.overrides(ParameterKind::Inference);
        store.set_override(
            ParameterKind::Inference,
            "temperature",
            ParamValue::Float(0.9),
        );
        let after = store.overrides(ParameterKind::Inference);

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.get("temperature"), Some(&ParamValue::Float(0.8)));
        assert_eq!(after.get("temperature"), Some(&ParamValue::Float(0.9)));
    }

    #[test]
    fn test_model_switch_isolation() {
        let mut store = ParameterStore::new();
        store.select_model("model-a");
        store.ingest_loading_schema(loading_schema());
        store.set_override(ParameterKind::Loading, "n_ctx", ParamValue::Int(1024));

        // Re-selecting the same model preserves the override.
        store.select_model("model-a");
        assert_eq!(
            store.effective_value(ParameterKind::Loading, "n_ctx").unwrap(),
            ParamValue::Int(1024)
        );

        // Switching to a different model clears it; after reset the
        // model-specific default applies, not model A's override.
        store.select_model("model-b");
        store.reset_to_defaults(ParameterKind::Loading, None);
        assert_eq!(
            store.effective_value(ParameterKind::Loading, "n_ctx").unwrap(),
            ParamValue::Int(8192)
        );
        assert_eq!(
            store
                .effective_value(ParameterKind::Loading, "use_mmap")
                .unwrap(),
            ParamValue::Bool(true)
        );
    }

    #[test]
    fn test_loading_reset_merges_global_then_model_specific() {
        let mut store = ParameterStore::new();
        store.ingest_loading_schema(loading_schema());

        store.reset_to_defaults(ParameterKind::Loading, Some("model-b"));
        let overrides = store.overrides(ParameterKind::Loading);
        assert_eq!(overrides.get("n_ctx"), Some(&ParamValue::Int(8192)));
        assert_eq!(overrides.get("use_mmap"), Some(&ParamValue::Bool(true)));
    }
}
