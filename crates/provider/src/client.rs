//! Client for communicating with the Elastic Transcoder service

use std::collections::HashMap;

use aws_config::BehaviorVersion;
use aws_sdk_elastictranscoder::config::Region;
use aws_sdk_elastictranscoder::error::DisplayErrorContext;
use aws_sdk_elastictranscoder::types as sdk;
use aws_sdk_elastictranscoder::Client;
use tracing::debug;

use transcoder_common::{
    AudioCodecOptions, AudioParameters, CreatePresetRequest, CreatePresetResponse, Error, Preset,
    PresetWatermark, Result, Thumbnails, VideoParameters,
};

use crate::config::ProviderConfig;

/// Remote operations the preset resource relies on.
///
/// There is deliberately no delete: presets are never removed remotely.
#[async_trait::async_trait]
pub trait TranscoderApi: Send + Sync {
    /// Create a preset, returning the stored preset and any service warning
    async fn create_preset(&self, request: CreatePresetRequest) -> Result<CreatePresetResponse>;

    /// Fetch a preset; a missing preset is `Error::NotFound`
    async fn read_preset(&self, id: &str) -> Result<Preset>;
}

/// Client wrapper around the AWS SDK
#[derive(Clone, Debug)]
pub struct AwsTranscoderClient {
    client: Client,
}

impl AwsTranscoderClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the shared AWS configuration chain plus overrides
    pub async fn from_config(config: &ProviderConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_elastictranscoder::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait::async_trait]
impl TranscoderApi for AwsTranscoderClient {
    async fn create_preset(&self, request: CreatePresetRequest) -> Result<CreatePresetResponse> {
        let output = self
            .client
            .create_preset()
            .name(request.name)
            .container(request.container)
            .set_description(request.description)
            .set_audio(request.audio.as_ref().map(audio_to_sdk))
            .set_video(request.video.as_ref().map(video_to_sdk))
            .set_thumbnails(request.thumbnails.as_ref().map(thumbnails_to_sdk))
            .send()
            .await
            .map_err(|e| Error::service("CreatePreset", DisplayErrorContext(&e).to_string()))?;

        let preset = output
            .preset()
            .map(preset_from_sdk)
            .ok_or_else(|| Error::service("CreatePreset", "No preset in response"))?;

        Ok(CreatePresetResponse {
            preset,
            warning: owned(output.warning()),
        })
    }

    async fn read_preset(&self, id: &str) -> Result<Preset> {
        let not_found = || Error::NotFound {
            kind: "preset".to_string(),
            id: id.to_string(),
        };

        let output = match self.client.read_preset().id(id).send().await {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if missing {
                    debug!("Preset {} does not exist", id);
                    return Err(not_found());
                }
                return Err(Error::service("ReadPreset", DisplayErrorContext(&err).to_string()));
            }
        };

        output.preset().map(preset_from_sdk).ok_or_else(not_found)
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn audio_to_sdk(audio: &AudioParameters) -> sdk::AudioParameters {
    sdk::AudioParameters::builder()
        .set_audio_packing_mode(audio.audio_packing_mode.clone())
        .set_bit_rate(audio.bit_rate.clone())
        .set_channels(audio.channels.clone())
        .set_codec(audio.codec.clone())
        .set_codec_options(audio.codec_options.as_ref().map(|opts| {
            sdk::AudioCodecOptions::builder()
                .set_bit_depth(opts.bit_depth.clone())
                .set_bit_order(opts.bit_order.clone())
                .set_profile(opts.profile.clone())
                .set_signed(opts.signed.clone())
                .build()
        }))
        .set_sample_rate(audio.sample_rate.clone())
        .build()
}

fn video_to_sdk(video: &VideoParameters) -> sdk::VideoParameters {
    let codec_options = (!video.codec_options.is_empty()).then(|| {
        video
            .codec_options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<HashMap<_, _>>()
    });
    let watermarks = (!video.watermarks.is_empty())
        .then(|| video.watermarks.iter().map(watermark_to_sdk).collect::<Vec<_>>());

    sdk::VideoParameters::builder()
        .set_aspect_ratio(video.aspect_ratio.clone())
        .set_bit_rate(video.bit_rate.clone())
        .set_codec(video.codec.clone())
        .set_codec_options(codec_options)
        .set_display_aspect_ratio(video.display_aspect_ratio.clone())
        .set_fixed_gop(video.fixed_gop.clone())
        .set_frame_rate(video.frame_rate.clone())
        .set_keyframes_max_dist(video.keyframes_max_dist.clone())
        .set_max_frame_rate(video.max_frame_rate.clone())
        .set_max_height(video.max_height.clone())
        .set_max_width(video.max_width.clone())
        .set_padding_policy(video.padding_policy.clone())
        .set_resolution(video.resolution.clone())
        .set_sizing_policy(video.sizing_policy.clone())
        .set_watermarks(watermarks)
        .build()
}

fn watermark_to_sdk(mark: &PresetWatermark) -> sdk::PresetWatermark {
    sdk::PresetWatermark::builder()
        .set_horizontal_align(mark.horizontal_align.clone())
        .set_horizontal_offset(mark.horizontal_offset.clone())
        .set_id(mark.id.clone())
        .set_max_height(mark.max_height.clone())
        .set_max_width(mark.max_width.clone())
        .set_opacity(mark.opacity.clone())
        .set_sizing_policy(mark.sizing_policy.clone())
        .set_target(mark.target.clone())
        .set_vertical_align(mark.vertical_align.clone())
        .set_vertical_offset(mark.vertical_offset.clone())
        .build()
}

fn thumbnails_to_sdk(thumbs: &Thumbnails) -> sdk::Thumbnails {
    sdk::Thumbnails::builder()
        .set_aspect_ratio(thumbs.aspect_ratio.clone())
        .set_format(thumbs.format.clone())
        .set_interval(thumbs.interval.clone())
        .set_max_height(thumbs.max_height.clone())
        .set_max_width(thumbs.max_width.clone())
        .set_padding_policy(thumbs.padding_policy.clone())
        .set_resolution(thumbs.resolution.clone())
        .set_sizing_policy(thumbs.sizing_policy.clone())
        .build()
}

fn preset_from_sdk(preset: &sdk::Preset) -> Preset {
    Preset {
        id: owned(preset.id()),
        arn: owned(preset.arn()),
        name: owned(preset.name()),
        description: owned(preset.description()),
        container: owned(preset.container()),
        preset_type: owned(preset.r#type()),
        audio: preset.audio().map(audio_from_sdk),
        video: preset.video().map(video_from_sdk),
        thumbnails: preset.thumbnails().map(thumbnails_from_sdk),
    }
}

fn audio_from_sdk(audio: &sdk::AudioParameters) -> AudioParameters {
    AudioParameters {
        audio_packing_mode: owned(audio.audio_packing_mode()),
        bit_rate: owned(audio.bit_rate()),
        channels: owned(audio.channels()),
        codec: owned(audio.codec()),
        codec_options: audio.codec_options().map(|opts| AudioCodecOptions {
            bit_depth: owned(opts.bit_depth()),
            bit_order: owned(opts.bit_order()),
            profile: owned(opts.profile()),
            signed: owned(opts.signed()),
        }),
        sample_rate: owned(audio.sample_rate()),
    }
}

fn video_from_sdk(video: &sdk::VideoParameters) -> VideoParameters {
    VideoParameters {
        aspect_ratio: owned(video.aspect_ratio()),
        bit_rate: owned(video.bit_rate()),
        codec: owned(video.codec()),
        codec_options: video
            .codec_options()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
        display_aspect_ratio: owned(video.display_aspect_ratio()),
        fixed_gop: owned(video.fixed_gop()),
        frame_rate: owned(video.frame_rate()),
        keyframes_max_dist: owned(video.keyframes_max_dist()),
        max_frame_rate: owned(video.max_frame_rate()),
        max_height: owned(video.max_height()),
        max_width: owned(video.max_width()),
        padding_policy: owned(video.padding_policy()),
        resolution: owned(video.resolution()),
        sizing_policy: owned(video.sizing_policy()),
        watermarks: video
            .watermarks()
            .iter()
            .map(|w| PresetWatermark {
                horizontal_align: owned(w.horizontal_align()),
                horizontal_offset: owned(w.horizontal_offset()),
                id: owned(w.id()),
                max_height: owned(w.max_height()),
                max_width: owned(w.max_width()),
                opacity: owned(w.opacity()),
                sizing_policy: owned(w.sizing_policy()),
                target: owned(w.target()),
                vertical_align: owned(w.vertical_align()),
                vertical_offset: owned(w.vertical_offset()),
            })
            .collect(),
    }
}

fn thumbnails_from_sdk(thumbs: &sdk::Thumbnails) -> Thumbnails {
    Thumbnails {
        aspect_ratio: owned(thumbs.aspect_ratio()),
        format: owned(thumbs.format()),
        interval: owned(thumbs.interval()),
        max_height: owned(thumbs.max_height()),
        max_width: owned(thumbs.max_width()),
        padding_policy: owned(thumbs.padding_policy()),
        resolution: owned(thumbs.resolution()),
        sizing_policy: owned(thumbs.sizing_policy()),
    }
}
