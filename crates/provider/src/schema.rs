//! Resource Schemas
//!
//! Declares the attribute schema of each resource and checks configurations
//! against it before they reach a resource handler.

use serde::Serialize;

use crate::state::DynamicValue;

/// Type of a leaf attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Map(Box<AttributeType>),
}

/// Leaf attribute declaration
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
}

impl Attribute {
    fn new(name: &str, ty: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            description: String::new(),
            required: false,
            optional: false,
            computed: false,
            force_new: false,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn map_of_strings(name: &str) -> Self {
        Self::new(name, AttributeType::Map(Box::new(AttributeType::String)))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }
}

/// Nested block declaration; members form an unordered set
#[derive(Debug, Clone, Serialize)]
pub struct NestedBlock {
    pub name: String,
    /// Zero means unbounded
    pub max_items: usize,
    pub force_new: bool,
    pub block: Block,
}

impl NestedBlock {
    pub fn set(name: &str, block: Block) -> Self {
        Self {
            name: name.to_string(),
            max_items: 0,
            force_new: false,
            block,
        }
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = n;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// A block of attributes and nested blocks
#[derive(Debug, Clone, Default, Serialize)]
pub struct Block {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<NestedBlock>,
}

/// Top-level schema of a resource
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Problem report returned to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.attribute = Some(path.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Block {
    pub fn new(attributes: Vec<Attribute>, blocks: Vec<NestedBlock>) -> Self {
        Self {
            description: String::new(),
            attributes,
            blocks,
        }
    }

    pub fn with_description(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested(&self, name: &str) -> Option<&NestedBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Check a configuration against this block
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        self.validate_at("", config, &mut diags);
        diags
    }

    fn validate_at(&self, prefix: &str, config: &DynamicValue, diags: &mut Vec<Diagnostic>) {
        let path = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", prefix, name)
            }
        };

        let Some(map) = config.as_map() else {
            if !config.is_null() {
                diags.push(
                    Diagnostic::error("Invalid block", "expected an object").at(prefix),
                );
            }
            return;
        };

        for attr in &self.attributes {
            let value = map.get(&attr.name).filter(|v| !v.is_null());
            match value {
                None if attr.required => diags.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required", attr.name),
                    )
                    .at(path(&attr.name)),
                ),
                None => {}
                Some(v) => check_type(&attr.ty, v, &path(&attr.name), diags),
            }
        }

        for nested in &self.blocks {
            let members: Vec<&DynamicValue> = match map.get(&nested.name) {
                None | Some(DynamicValue::Null) => Vec::new(),
                Some(DynamicValue::List(items)) => items.iter().collect(),
                Some(v @ DynamicValue::Map(_)) => vec![v],
                Some(_) => {
                    diags.push(
                        Diagnostic::error(
                            "Invalid block",
                            format!("\"{}\" must be a block", nested.name),
                        )
                        .at(path(&nested.name)),
                    );
                    continue;
                }
            };

            if nested.max_items > 0 && members.len() > nested.max_items {
                diags.push(
                    Diagnostic::error(
                        "Too many blocks",
                        format!(
                            "No more than {} \"{}\" blocks are allowed, got {}",
                            nested.max_items,
                            nested.name,
                            members.len()
                        ),
                    )
                    .at(path(&nested.name)),
                );
            }
            for member in members {
                nested.block.validate_at(&path(&nested.name), member, diags);
            }
        }

        for key in map.keys() {
            if key == "id" && prefix.is_empty() {
                continue;
            }
            if self.attribute(key).is_none() && self.nested(key).is_none() {
                diags.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named \"{}\" is not expected here", key),
                    )
                    .at(path(key)),
                );
            }
        }
    }

    /// Attribute and block paths whose change forces replacement
    pub fn force_new_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_force_new("", &mut paths);
        paths
    }

    fn collect_force_new(&self, prefix: &str, paths: &mut Vec<String>) {
        let join = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", prefix, name)
            }
        };
        for attr in self.attributes.iter().filter(|a| a.force_new) {
            paths.push(join(&attr.name));
        }
        for nested in &self.blocks {
            if nested.force_new {
                paths.push(join(&nested.name));
            }
            nested.block.collect_force_new(&join(&nested.name), paths);
        }
    }
}

fn check_type(ty: &AttributeType, value: &DynamicValue, path: &str, diags: &mut Vec<Diagnostic>) {
    let ok = match ty {
        // leaves accept numbers and booleans, coerced by the handlers
        AttributeType::String => matches!(
            value,
            DynamicValue::String(_) | DynamicValue::Number(_) | DynamicValue::Bool(_)
        ),
        AttributeType::Map(elem) => match value.as_map() {
            Some(m) => {
                for (k, v) in m {
                    check_type(elem, v, &format!("{}.{}", path, k), diags);
                }
                true
            }
            None => false,
        },
    };

    if !ok {
        diags.push(
            Diagnostic::error("Incorrect attribute value type", format!("expected {:?}", ty))
                .at(path),
        );
    }
}

fn optional_string(name: &str) -> Attribute {
    Attribute::string(name).optional().force_new()
}

/// Schema of `aws_elastictranscoder_preset`
pub fn preset_schema() -> Schema {
    let audio_codec_options = Block::new(
        vec![
            optional_string("bit_depth"),
            optional_string("bit_order"),
            optional_string("profile"),
            optional_string("signed"),
        ],
        vec![],
    );

    let audio = Block::new(
        vec![
            optional_string("audio_packing_mode"),
            optional_string("bit_rate"),
            optional_string("channels"),
            optional_string("codec"),
            optional_string("sample_rate"),
        ],
        vec![NestedBlock::set("codec_options", audio_codec_options)
            .max_items(1)
            .force_new()],
    );

    let watermark = Block::new(
        vec![
            optional_string("horizontal_align"),
            optional_string("horizontal_offset"),
            optional_string("id"),
            optional_string("max_height"),
            optional_string("max_width"),
            optional_string("opacity"),
            optional_string("sizing_policy"),
            optional_string("target"),
            optional_string("vertical_align"),
            optional_string("vertical_offset"),
        ],
        vec![],
    );

    let video = Block::new(
        vec![
            optional_string("aspect_ratio"),
            optional_string("bit_rate"),
            optional_string("codec"),
            Attribute::map_of_strings("codec_options").optional().force_new(),
            optional_string("display_aspect_ratio"),
            optional_string("fixed_gop"),
            optional_string("frame_rate"),
            optional_string("key_frames_max_dist"),
            optional_string("max_frame_rate"),
            optional_string("max_height"),
            optional_string("max_width"),
            optional_string("padding_policy"),
            optional_string("resolution"),
            optional_string("sizing_policy"),
        ],
        vec![NestedBlock::set("watermarks", watermark).force_new()],
    );

    let thumbnails = Block::new(
        vec![
            optional_string("aspect_ratio"),
            optional_string("format"),
            optional_string("interval"),
            optional_string("max_height"),
            optional_string("max_width"),
            optional_string("padding_policy"),
            optional_string("resolution"),
            optional_string("sizing_policy"),
        ],
        vec![],
    );

    Schema {
        version: 0,
        block: Block::new(
            vec![
                Attribute::string("arn").optional().computed(),
                Attribute::string("container")
                    .required()
                    .force_new()
                    .description("Container type of the output file, e.g. mp4, ts, webm"),
                Attribute::string("description").optional().force_new(),
                Attribute::string("name").required().force_new(),
                Attribute::string("type")
                    .optional()
                    .computed()
                    .description("Custom or System, resolved by the service"),
            ],
            vec![
                NestedBlock::set("audio", audio).max_items(1).force_new(),
                NestedBlock::set("thumbnails", thumbnails).max_items(1).force_new(),
                NestedBlock::set("video", video).max_items(1).force_new(),
            ],
        )
        .with_description("Elastic Transcoder preset"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> DynamicValue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_minimal_config_is_valid() {
        let schema = preset_schema();
        let config = tree(json!({"name": "web", "container": "mp4"}));
        assert!(schema.block.validate(&config).is_empty());
    }

    #[test]
    fn test_missing_required_attributes() {
        let schema = preset_schema();
        let diags = schema.block.validate(&tree(json!({"description": "no name"})));

        let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert!(paths.contains(&"name".to_string()));
        assert!(paths.contains(&"container".to_string()));
        assert!(diags.iter().all(|d| d.is_error()));
    }

    #[test]
    fn test_computed_attributes_not_required() {
        let schema = preset_schema();
        let config = tree(json!({"name": "web", "container": "mp4", "arn": null, "type": null}));
        assert!(schema.block.validate(&config).is_empty());
    }

    #[test]
    fn test_max_items_enforced() {
        let schema = preset_schema();
        let config = tree(json!({
            "name": "web",
            "container": "mp4",
            "audio": [{"codec": "AAC"}, {"codec": "mp3"}]
        }));

        let diags = schema.block.validate(&config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Too many blocks");
        assert_eq!(diags[0].attribute.as_deref(), Some("audio"));
    }

    #[test]
    fn test_watermarks_unbounded() {
        let schema = preset_schema();
        let marks: Vec<_> = (0..4).map(|i| json!({"id": format!("wm{}", i)})).collect();
        let config = tree(json!({
            "name": "web",
            "container": "mp4",
            "video": [{"codec": "H.264", "watermarks": marks}]
        }));
        assert!(schema.block.validate(&config).is_empty());
    }

    #[test]
    fn test_misspelled_keys_rejected() {
        let schema = preset_schema();
        let config = tree(json!({
            "name": "web",
            "container": "mp4",
            "audio": [{"codec_options": [{"bit_prder": "LittleEndian"}]}],
            "video": [{"display_apect_ratio": "16:9"}]
        }));

        let paths: Vec<_> = schema
            .block
            .validate(&config)
            .into_iter()
            .filter_map(|d| d.attribute)
            .collect();
        assert!(paths.contains(&"audio.codec_options.bit_prder".to_string()));
        assert!(paths.contains(&"video.display_apect_ratio".to_string()));
    }

    #[test]
    fn test_codec_options_must_be_map() {
        let schema = preset_schema();
        let config = tree(json!({
            "name": "web",
            "container": "mp4",
            "video": [{"codec_options": "Profile=main"}]
        }));

        let diags = schema.block.validate(&config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("video.codec_options"));
    }

    #[test]
    fn test_every_user_attribute_forces_new() {
        let schema = preset_schema();
        let paths = schema.block.force_new_paths();

        for name in ["name", "container", "description", "audio", "video", "thumbnails"] {
            assert!(paths.contains(&name.to_string()), "{} should force new", name);
        }
        assert!(paths.contains(&"video.watermarks.opacity".to_string()));
        assert!(!paths.contains(&"arn".to_string()));
        assert!(!paths.contains(&"type".to_string()));
    }
}
