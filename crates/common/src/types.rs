//! Preset model shared by the provider and the remote client
//!
//! Every leaf is an optional string, mirroring the remote API where bit
//! rates, sizes and frame rates all travel as strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A transcoding preset as returned by the remote service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: Option<String>,
    pub arn: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub container: Option<String>,
    /// `Custom` for user presets, `System` for the service defaults
    #[serde(rename = "type")]
    pub preset_type: Option<String>,
    pub audio: Option<AudioParameters>,
    pub video: Option<VideoParameters>,
    pub thumbnails: Option<Thumbnails>,
}

/// Audio encoding parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioParameters {
    pub audio_packing_mode: Option<String>,
    pub bit_rate: Option<String>,
    pub channels: Option<String>,
    pub codec: Option<String>,
    pub codec_options: Option<AudioCodecOptions>,
    pub sample_rate: Option<String>,
}

/// Codec-specific audio options (PCM and AAC)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCodecOptions {
    pub bit_depth: Option<String>,
    pub bit_order: Option<String>,
    pub profile: Option<String>,
    pub signed: Option<String>,
}

/// Video encoding parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoParameters {
    pub aspect_ratio: Option<String>,
    pub bit_rate: Option<String>,
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub codec_options: BTreeMap<String, String>,
    pub display_aspect_ratio: Option<String>,
    pub fixed_gop: Option<String>,
    pub frame_rate: Option<String>,
    pub keyframes_max_dist: Option<String>,
    pub max_frame_rate: Option<String>,
    pub max_height: Option<String>,
    pub max_width: Option<String>,
    pub padding_policy: Option<String>,
    pub resolution: Option<String>,
    pub sizing_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watermarks: Vec<PresetWatermark>,
}

/// Watermark overlay settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetWatermark {
    pub horizontal_align: Option<String>,
    pub horizontal_offset: Option<String>,
    pub id: Option<String>,
    pub max_height: Option<String>,
    pub max_width: Option<String>,
    pub opacity: Option<String>,
    pub sizing_policy: Option<String>,
    pub target: Option<String>,
    pub vertical_align: Option<String>,
    pub vertical_offset: Option<String>,
}

/// Thumbnail generation parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnails {
    pub aspect_ratio: Option<String>,
    pub format: Option<String>,
    pub interval: Option<String>,
    pub max_height: Option<String>,
    pub max_width: Option<String>,
    pub padding_policy: Option<String>,
    pub resolution: Option<String>,
    pub sizing_policy: Option<String>,
}

/// Input of the create-preset call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePresetRequest {
    pub name: String,
    pub description: Option<String>,
    pub container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Thumbnails>,
}

/// Output of the create-preset call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePresetResponse {
    pub preset: Preset,
    /// Set when the requested settings are incompatible with some outputs
    pub warning: Option<String>,
}
