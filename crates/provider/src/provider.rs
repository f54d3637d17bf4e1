//! Transcoder Provider Implementation
//!
//! Dispatches host requests (schema, validate, plan, read, apply) to the
//! resource handlers and turns handler failures into diagnostics.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use transcoder_common::{Error, PRESET_RESOURCE_TYPE};

use crate::client::{AwsTranscoderClient, TranscoderApi};
use crate::config::ProviderConfig;
use crate::resources::{preset::PresetResource, Resource};
use crate::schema::{Diagnostic, Schema};
use crate::state::{DynamicValue, ResourceData};

/// Planned action for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    NoOp,
    Create,
    Replace,
    Delete,
}

/// Result of planning a change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedChange {
    pub action: PlanAction,
    pub planned_state: Option<DynamicValue>,
    pub requires_replace: Vec<String>,
}

/// Result of refreshing a resource
#[derive(Debug, Clone, Serialize)]
pub struct ReadResponse {
    /// `None` when the resource no longer exists
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of applying a change
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResponse {
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Transcoder Provider
pub struct TranscoderProvider {
    /// Client for the remote service
    client: Arc<RwLock<Option<Arc<dyn TranscoderApi>>>>,
    config: ProviderConfig,
}

impl TranscoderProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// Provider with a ready client, skipping `configure`
    pub fn with_client(client: Arc<dyn TranscoderApi>) -> Self {
        Self {
            client: Arc::new(RwLock::new(Some(client))),
            config: ProviderConfig::default(),
        }
    }

    /// Build the AWS client from the provider configuration
    pub async fn configure(&self) {
        info!(
            "Configuring provider (region: {}, endpoint: {})",
            self.config.region.as_deref().unwrap_or("default"),
            self.config.endpoint_url.as_deref().unwrap_or("default"),
        );

        let client = AwsTranscoderClient::from_config(&self.config).await;
        *self.client.write().await = Some(Arc::new(client));
    }

    async fn client(&self) -> Result<Arc<dyn TranscoderApi>, Error> {
        self.client.read().await.clone().ok_or(Error::NotConfigured)
    }

    pub fn resource_schemas(&self) -> BTreeMap<String, Schema> {
        [(PresetResource::type_name().to_string(), PresetResource::schema())]
            .into_iter()
            .collect()
    }

    fn schema_for(&self, type_name: &str) -> Result<Schema, Error> {
        match type_name {
            PRESET_RESOURCE_TYPE => Ok(PresetResource::schema()),
            _ => Err(Error::UnknownResourceType(type_name.to_string())),
        }
    }

    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &DynamicValue,
    ) -> Result<Vec<Diagnostic>, Error> {
        debug!("ValidateResourceConfig called for {}", type_name);
        Ok(self.schema_for(type_name)?.block.validate(config))
    }

    /// Work out what applying `proposed` over `prior` would do
    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<&DynamicValue>,
        proposed: Option<&DynamicValue>,
    ) -> Result<PlannedChange, Error> {
        debug!("PlanResourceChange called for {}", type_name);
        let schema = self.schema_for(type_name)?;

        let prior = prior.filter(|v| !v.is_null());
        let proposed = proposed.filter(|v| !v.is_null());

        let change = match (prior, proposed) {
            (None, None) => PlannedChange {
                action: PlanAction::NoOp,
                planned_state: None,
                requires_replace: vec![],
            },
            (None, Some(proposed)) => PlannedChange {
                action: PlanAction::Create,
                planned_state: Some(proposed.clone()),
                requires_replace: vec![],
            },
            (Some(_), None) => PlannedChange {
                action: PlanAction::Delete,
                planned_state: None,
                requires_replace: vec![],
            },
            (Some(prior), Some(proposed)) => {
                // Nested changes surface through their top-level block
                let changed: Vec<String> = schema
                    .block
                    .force_new_paths()
                    .into_iter()
                    .filter(|path| !path.contains('.'))
                    .filter(|name| differs(prior.get(name), proposed.get(name)))
                    .collect();

                if changed.is_empty() {
                    PlannedChange {
                        action: PlanAction::NoOp,
                        planned_state: Some(prior.clone()),
                        requires_replace: vec![],
                    }
                } else {
                    PlannedChange {
                        action: PlanAction::Replace,
                        planned_state: Some(proposed.clone()),
                        requires_replace: changed,
                    }
                }
            }
        };

        Ok(change)
    }

    pub async fn read_resource(
        &self,
        type_name: &str,
        current_state: &DynamicValue,
    ) -> Result<ReadResponse, Error> {
        info!("ReadResource called for {}", type_name);
        self.schema_for(type_name)?;
        let client = self.client().await?;

        let mut data = ResourceData::from_state(current_state);
        let result = PresetResource::read(client.as_ref(), &mut data).await;

        match result {
            Ok(()) => Ok(ReadResponse {
                new_state: data.into_state(),
                diagnostics: vec![],
            }),
            Err(e) => {
                error!("Failed to read {}: {:#}", type_name, e);
                Ok(ReadResponse {
                    new_state: Some(current_state.clone()),
                    diagnostics: vec![Diagnostic::error("Failed to read resource", format!("{:#}", e))],
                })
            }
        }
    }

    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior_state: Option<&DynamicValue>,
        planned_state: Option<&DynamicValue>,
    ) -> Result<ApplyResponse, Error> {
        info!("ApplyResourceChange called for {}", type_name);
        self.schema_for(type_name)?;
        let client = self.client().await?;
        let client = client.as_ref();

        let prior_state = prior_state.filter(|v| !v.is_null());
        let planned_state = planned_state.filter(|v| !v.is_null());

        // a create that fails after the service assigned an id still
        // reports that id so the remote preset stays tracked
        let (new_state, result, warnings) = match (prior_state, planned_state) {
            // Create
            (None, Some(planned)) => {
                let mut data = ResourceData::new(planned);
                let result = PresetResource::create(client, &mut data).await;
                let warnings = data.take_warnings();
                (data.into_state(), result, warnings)
            }
            // Delete
            (Some(prior), None) => {
                let mut data = ResourceData::from_state(prior);
                match PresetResource::delete(client, &mut data).await {
                    Ok(()) => (None, Ok(()), data.take_warnings()),
                    Err(e) => (Some(prior.clone()), Err(e), vec![]),
                }
            }
            // Update
            (Some(prior), Some(planned)) => {
                let mut data = ResourceData::from_state(planned);
                data.set_id(ResourceData::from_state(prior).id());
                match PresetResource::update(client, &mut data).await {
                    Ok(()) => {
                        let warnings = data.take_warnings();
                        (data.into_state(), Ok(()), warnings)
                    }
                    Err(e) => (Some(prior.clone()), Err(e), vec![]),
                }
            }
            // No change
            (None, None) => (None, Ok(()), vec![]),
        };

        let mut diagnostics: Vec<Diagnostic> = warnings
            .into_iter()
            .map(|w| Diagnostic::warning("Service warning", w))
            .collect();

        if let Err(e) = result {
            error!("Failed to apply {} change: {:#}", type_name, e);
            diagnostics.push(Diagnostic::error(
                "Failed to apply resource change",
                format!("{:#}", e),
            ));
        }

        Ok(ApplyResponse {
            new_state,
            diagnostics,
        })
    }
}

/// Canonical form for comparison: unset leaves dropped, scalars as strings,
/// block members sorted and deduplicated since every nested block is a set
fn normalize(value: &DynamicValue) -> DynamicValue {
    match value {
        DynamicValue::Map(m) => DynamicValue::Map(
            m.iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .filter(|(_, v)| !v.is_null_or_empty())
                .collect(),
        ),
        DynamicValue::List(items) => {
            let mut members: Vec<(String, DynamicValue)> = items
                .iter()
                .map(normalize)
                .filter(|v| !v.is_null_or_empty())
                .map(|v| (sort_key(&v), v))
                .collect();
            members.sort_by(|a, b| a.0.cmp(&b.0));
            members.dedup_by(|a, b| a.0 == b.0);
            DynamicValue::List(members.into_iter().map(|(_, v)| v).collect())
        }
        other => other
            .to_attr_string()
            .map(DynamicValue::String)
            .unwrap_or(DynamicValue::Null),
    }
}

/// Order-independent rendering of a normalized value
fn sort_key(value: &DynamicValue) -> String {
    match value {
        DynamicValue::Map(m) => {
            let mut entries: Vec<(&String, &DynamicValue)> = m.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let inner: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{:?}:{}", k, sort_key(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        DynamicValue::List(items) => {
            let inner: Vec<String> = items.iter().map(sort_key).collect();
            format!("[{}]", inner.join(","))
        }
        other => format!("{:?}", other.to_attr_string()),
    }
}

fn differs(a: Option<&DynamicValue>, b: Option<&DynamicValue>) -> bool {
    let canonical = |v: Option<&DynamicValue>| {
        v.map(normalize)
            .filter(|v| !v.is_null_or_empty())
            .unwrap_or_default()
    };
    canonical(a) != canonical(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> DynamicValue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_schemas_list_preset() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let schemas = provider.resource_schemas();
        assert!(schemas.contains_key(PRESET_RESOURCE_TYPE));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let err = provider
            .validate_resource_config("aws_elastictranscoder_pipeline", &DynamicValue::Null)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownResourceType(_)));
    }

    #[test]
    fn test_plan_create_and_delete() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let config = tree(json!({"name": "web", "container": "mp4"}));

        let create = provider
            .plan_resource_change(PRESET_RESOURCE_TYPE, None, Some(&config))
            .unwrap();
        assert_eq!(create.action, PlanAction::Create);

        let delete = provider
            .plan_resource_change(PRESET_RESOURCE_TYPE, Some(&config), Some(&DynamicValue::Null))
            .unwrap();
        assert_eq!(delete.action, PlanAction::Delete);
    }

    #[test]
    fn test_plan_any_change_replaces() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let prior = tree(json!({
            "id": "1", "arn": "arn:1", "type": "Custom",
            "name": "web", "container": "mp4",
            "audio": [{"codec": "AAC"}]
        }));
        let proposed = tree(json!({
            "name": "web", "container": "mp4",
            "audio": [{"codec": "mp3"}]
        }));

        let plan = provider
            .plan_resource_change(PRESET_RESOURCE_TYPE, Some(&prior), Some(&proposed))
            .unwrap();
        assert_eq!(plan.action, PlanAction::Replace);
        assert_eq!(plan.requires_replace, vec!["audio".to_string()]);
    }

    #[test]
    fn test_plan_ignores_computed_attributes() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let prior = tree(json!({
            "id": "1", "arn": "arn:1", "type": "Custom",
            "name": "web", "container": "mp4", "description": ""
        }));
        let proposed = tree(json!({"name": "web", "container": "mp4", "arn": null}));

        let plan = provider
            .plan_resource_change(PRESET_RESOURCE_TYPE, Some(&prior), Some(&proposed))
            .unwrap();
        assert_eq!(plan.action, PlanAction::NoOp);
        assert!(plan.requires_replace.is_empty());
    }

    #[test]
    fn test_plan_normalizes_null_and_numeric_leaves() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let prior = tree(json!({
            "id": "1", "name": "web", "container": "mp4",
            "audio": [{"codec": "mp3", "bit_rate": "320"}]
        }));

        for proposed in [
            json!({"name": "web", "container": "mp4",
                   "audio": [{"codec": "mp3", "bit_rate": "320", "channels": null}]}),
            json!({"name": "web", "container": "mp4",
                   "audio": [{"codec": "mp3", "bit_rate": 320, "codec_options": []}]}),
        ] {
            let plan = provider
                .plan_resource_change(PRESET_RESOURCE_TYPE, Some(&prior), Some(&tree(proposed)))
                .unwrap();
            assert_eq!(plan.action, PlanAction::NoOp, "{:?}", plan.requires_replace);
        }
    }

    #[test]
    fn test_plan_ignores_watermark_order() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let logo = json!({"id": "logo", "opacity": "50", "target": "Content"});
        let bug = json!({"id": "bug", "opacity": "100", "target": "Frame"});

        let prior = tree(json!({
            "id": "1", "name": "web", "container": "mp4",
            "video": [{"codec": "H.264", "watermarks": [logo.clone(), bug.clone()]}]
        }));
        let proposed = tree(json!({
            "name": "web", "container": "mp4",
            "video": [{"codec": "H.264", "watermarks": [bug, logo]}]
        }));

        let plan = provider
            .plan_resource_change(PRESET_RESOURCE_TYPE, Some(&prior), Some(&proposed))
            .unwrap();
        assert_eq!(plan.action, PlanAction::NoOp);
    }

    #[test]
    fn test_plan_detects_changed_watermark() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let prior = tree(json!({
            "name": "web", "container": "mp4",
            "video": [{"watermarks": [{"id": "logo", "opacity": "50"}]}]
        }));
        let proposed = tree(json!({
            "name": "web", "container": "mp4",
            "video": [{"watermarks": [{"id": "logo", "opacity": 75}]}]
        }));

        let plan = provider
            .plan_resource_change(PRESET_RESOURCE_TYPE, Some(&prior), Some(&proposed))
            .unwrap();
        assert_eq!(plan.action, PlanAction::Replace);
        assert_eq!(plan.requires_replace, vec!["video".to_string()]);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_errors() {
        let provider = TranscoderProvider::new(ProviderConfig::default());
        let err = provider
            .read_resource(PRESET_RESOURCE_TYPE, &tree(json!({"id": "1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }
}
