//! Elastic Transcoder Preset resource
//!
//! Presets cannot be changed once created: every user attribute forces
//! replacement, update is rejected and delete leaves the remote preset alone.

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use transcoder_common::{
    AudioCodecOptions, AudioParameters, CreatePresetRequest, Error, Preset, PresetWatermark,
    Thumbnails, VideoParameters, PRESET_RESOURCE_TYPE,
};

use super::Resource;
use crate::client::TranscoderApi;
use crate::schema::{preset_schema, Schema};
use crate::state::{
    get_block_list, get_optional_string_attr, get_single_block,
    get_string_map_attr, list_value, null_value, string_value, DynamicValue, ResourceData,
    StateMap,
};

pub struct PresetResource;

#[async_trait::async_trait]
impl Resource for PresetResource {
    fn type_name() -> &'static str {
        PRESET_RESOURCE_TYPE
    }

    fn schema() -> Schema {
        preset_schema()
    }

    async fn create(client: &dyn TranscoderApi, data: &mut ResourceData) -> Result<()> {
        let config = data.attributes();

        let request = CreatePresetRequest {
            name: required_string_attr(&config, "name")?,
            description: get_optional_string_attr(&config, "description"),
            container: required_string_attr(&config, "container")?,
            audio: expand_audio_params(&config),
            video: expand_video_params(&config),
            thumbnails: expand_thumbnails(&config),
        };

        debug!("Elastic Transcoder Preset create opts: {:?}", request);
        let response = client
            .create_preset(request)
            .await
            .context("Error creating Elastic Transcoder Preset")?;

        if let Some(warning) = response.warning.as_deref().filter(|w| !w.is_empty()) {
            warn!("Elastic Transcoder Preset: {}", warning);
            data.add_warning(warning);
        }

        let id = response
            .preset
            .id
            .clone()
            .ok_or_else(|| anyhow!("Elastic Transcoder Preset was created without an id"))?;
        info!("Created Elastic Transcoder Preset {}", id);

        data.set_id(id);
        if let Some(arn) = &response.preset.arn {
            data.set("arn", string_value(arn));
        }

        // no update path exists, so populate computed fields straight away
        Self::read(client, data).await
    }

    async fn read(client: &dyn TranscoderApi, data: &mut ResourceData) -> Result<()> {
        let id = data.id().to_string();

        let preset = match client.read_preset(&id).await {
            Ok(preset) => preset,
            Err(e) if e.is_not_found() => {
                info!("Elastic Transcoder Preset {} not found, removing from state", id);
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Elastic Transcoder Preset Read response: {:?}", preset);
        set_preset(data, &preset);
        Ok(())
    }

    async fn update(_client: &dyn TranscoderApi, data: &mut ResourceData) -> Result<()> {
        warn!("Update requested for Elastic Transcoder Preset {}", data.id());
        Err(Error::UpdateUnsupported {
            kind: Self::type_name().to_string(),
        }
        .into())
    }

    async fn delete(_client: &dyn TranscoderApi, data: &mut ResourceData) -> Result<()> {
        // the remote preset is left in place
        debug!("Dropping Elastic Transcoder Preset {} from state", data.id());
        Ok(())
    }
}

fn required_string_attr(config: &DynamicValue, key: &str) -> Result<String> {
    get_optional_string_attr(config, key).ok_or_else(|| {
        Error::MissingAttribute {
            kind: PRESET_RESOURCE_TYPE.to_string(),
            name: key.to_string(),
        }
        .into()
    })
}

fn set_preset(data: &mut ResourceData, preset: &Preset) {
    let mut set_scalar = |key: &str, value: &Option<String>| {
        if let Some(v) = value {
            data.set(key, string_value(v));
        }
    };

    set_scalar("arn", &preset.arn);
    set_scalar("container", &preset.container);
    set_scalar("description", &preset.description);
    set_scalar("name", &preset.name);
    set_scalar("type", &preset.preset_type);

    if let Some(audio) = &preset.audio {
        data.set("audio", flatten_audio_params(audio));
    }
    if let Some(thumbs) = &preset.thumbnails {
        data.set("thumbnails", flatten_thumbnails(thumbs));
    }
    if let Some(video) = &preset.video {
        data.set("video", flatten_video_params(video));
    }
}

/// Audio group of the configuration, `None` when the block is absent
pub fn expand_audio_params(config: &DynamicValue) -> Option<AudioParameters> {
    let audio = get_single_block(config, "audio")?;

    Some(AudioParameters {
        audio_packing_mode: get_optional_string_attr(audio, "audio_packing_mode"),
        bit_rate: get_optional_string_attr(audio, "bit_rate"),
        channels: get_optional_string_attr(audio, "channels"),
        codec: get_optional_string_attr(audio, "codec"),
        codec_options: expand_audio_codec_options(audio),
        sample_rate: get_optional_string_attr(audio, "sample_rate"),
    })
}

pub fn expand_audio_codec_options(audio: &DynamicValue) -> Option<AudioCodecOptions> {
    let codec = get_single_block(audio, "codec_options")?;

    Some(AudioCodecOptions {
        bit_depth: get_optional_string_attr(codec, "bit_depth"),
        bit_order: get_optional_string_attr(codec, "bit_order"),
        profile: get_optional_string_attr(codec, "profile"),
        signed: get_optional_string_attr(codec, "signed"),
    })
}

/// Video group of the configuration, `None` when the block is absent
pub fn expand_video_params(config: &DynamicValue) -> Option<VideoParameters> {
    let p = get_single_block(config, "video")?;

    Some(VideoParameters {
        aspect_ratio: get_optional_string_attr(p, "aspect_ratio"),
        bit_rate: get_optional_string_attr(p, "bit_rate"),
        codec: get_optional_string_attr(p, "codec"),
        codec_options: get_string_map_attr(p, "codec_options"),
        display_aspect_ratio: get_optional_string_attr(p, "display_aspect_ratio"),
        fixed_gop: get_optional_string_attr(p, "fixed_gop"),
        frame_rate: get_optional_string_attr(p, "frame_rate"),
        keyframes_max_dist: get_optional_string_attr(p, "key_frames_max_dist"),
        max_frame_rate: get_optional_string_attr(p, "max_frame_rate"),
        max_height: get_optional_string_attr(p, "max_height"),
        max_width: get_optional_string_attr(p, "max_width"),
        padding_policy: get_optional_string_attr(p, "padding_policy"),
        resolution: get_optional_string_attr(p, "resolution"),
        sizing_policy: get_optional_string_attr(p, "sizing_policy"),
        watermarks: expand_watermarks(p),
    })
}

/// One watermark per set member; identical members collapse
pub fn expand_watermarks(video: &DynamicValue) -> Vec<PresetWatermark> {
    let mut watermarks: Vec<PresetWatermark> = Vec::new();

    for w in get_block_list(video, "watermarks") {
        let watermark = PresetWatermark {
            horizontal_align: get_optional_string_attr(w, "horizontal_align"),
            horizontal_offset: get_optional_string_attr(w, "horizontal_offset"),
            id: get_optional_string_attr(w, "id"),
            max_height: get_optional_string_attr(w, "max_height"),
            max_width: get_optional_string_attr(w, "max_width"),
            opacity: get_optional_string_attr(w, "opacity"),
            sizing_policy: get_optional_string_attr(w, "sizing_policy"),
            target: get_optional_string_attr(w, "target"),
            vertical_align: get_optional_string_attr(w, "vertical_align"),
            vertical_offset: get_optional_string_attr(w, "vertical_offset"),
        };
        if !watermarks.contains(&watermark) {
            watermarks.push(watermark);
        }
    }

    watermarks
}

/// Thumbnail group of the configuration, `None` when the block is absent
pub fn expand_thumbnails(config: &DynamicValue) -> Option<Thumbnails> {
    let t = get_single_block(config, "thumbnails")?;

    Some(Thumbnails {
        aspect_ratio: get_optional_string_attr(t, "aspect_ratio"),
        format: get_optional_string_attr(t, "format"),
        interval: get_optional_string_attr(t, "interval"),
        max_height: get_optional_string_attr(t, "max_height"),
        max_width: get_optional_string_attr(t, "max_width"),
        padding_policy: get_optional_string_attr(t, "padding_policy"),
        resolution: get_optional_string_attr(t, "resolution"),
        sizing_policy: get_optional_string_attr(t, "sizing_policy"),
    })
}

pub fn flatten_audio_params(audio: &AudioParameters) -> DynamicValue {
    let mut m = StateMap::new();

    m.set_string("audio_packing_mode", audio.audio_packing_mode.as_deref());
    m.set_string("bit_rate", audio.bit_rate.as_deref());
    m.set_string("channels", audio.channels.as_deref());
    m.set_string("codec", audio.codec.as_deref());
    m.set("codec_options", flatten_audio_codec_options(audio.codec_options.as_ref()));
    m.set_string("sample_rate", audio.sample_rate.as_deref());

    m.into_set()
}

pub fn flatten_audio_codec_options(opts: Option<&AudioCodecOptions>) -> DynamicValue {
    let Some(opts) = opts else {
        return null_value();
    };

    let mut m = StateMap::new();

    m.set_string("bit_depth", opts.bit_depth.as_deref());
    m.set_string("bit_order", opts.bit_order.as_deref());
    m.set_string("profile", opts.profile.as_deref());
    m.set_string("signed", opts.signed.as_deref());

    m.into_set()
}

pub fn flatten_thumbnails(thumbs: &Thumbnails) -> DynamicValue {
    let mut m = StateMap::new();

    m.set_string("aspect_ratio", thumbs.aspect_ratio.as_deref());
    m.set_string("format", thumbs.format.as_deref());
    m.set_string("interval", thumbs.interval.as_deref());
    m.set_string("max_height", thumbs.max_height.as_deref());
    m.set_string("max_width", thumbs.max_width.as_deref());
    m.set_string("padding_policy", thumbs.padding_policy.as_deref());
    m.set_string("resolution", thumbs.resolution.as_deref());
    m.set_string("sizing_policy", thumbs.sizing_policy.as_deref());

    m.into_set()
}

pub fn flatten_video_params(video: &VideoParameters) -> DynamicValue {
    let mut m = StateMap::new();

    m.set_string("aspect_ratio", video.aspect_ratio.as_deref());
    m.set_string("bit_rate", video.bit_rate.as_deref());
    m.set_string("codec", video.codec.as_deref());
    m.set_string_map("codec_options", &video.codec_options);
    m.set_string("display_aspect_ratio", video.display_aspect_ratio.as_deref());
    m.set_string("fixed_gop", video.fixed_gop.as_deref());
    m.set_string("frame_rate", video.frame_rate.as_deref());
    m.set_string("key_frames_max_dist", video.keyframes_max_dist.as_deref());
    m.set_string("max_frame_rate", video.max_frame_rate.as_deref());
    m.set_string("max_height", video.max_height.as_deref());
    m.set_string("max_width", video.max_width.as_deref());
    m.set_string("padding_policy", video.padding_policy.as_deref());
    m.set_string("resolution", video.resolution.as_deref());
    m.set_string("sizing_policy", video.sizing_policy.as_deref());
    m.set("watermarks", flatten_watermarks(&video.watermarks));

    m.into_set()
}

pub fn flatten_watermarks(watermarks: &[PresetWatermark]) -> DynamicValue {
    let mut watermark_set = Vec::with_capacity(watermarks.len());

    for w in watermarks {
        let mut watermark = StateMap::new();

        watermark.set_string("horizontal_align", w.horizontal_align.as_deref());
        watermark.set_string("horizontal_offset", w.horizontal_offset.as_deref());
        watermark.set_string("id", w.id.as_deref());
        watermark.set_string("max_height", w.max_height.as_deref());
        watermark.set_string("max_width", w.max_width.as_deref());
        watermark.set_string("opacity", w.opacity.as_deref());
        watermark.set_string("sizing_policy", w.sizing_policy.as_deref());
        watermark.set_string("target", w.target.as_deref());
        watermark.set_string("vertical_align", w.vertical_align.as_deref());
        watermark.set_string("vertical_offset", w.vertical_offset.as_deref());

        watermark_set.push(watermark.into_value());
    }

    list_value(watermark_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::get_string_attr;
    use serde_json::json;
    use transcoder_common::{CreatePresetResponse, Result as CommonResult};

    fn tree(value: serde_json::Value) -> DynamicValue {
        serde_json::from_value(value).unwrap()
    }

    /// Client for paths that must not reach the service
    struct OfflineClient;

    #[async_trait::async_trait]
    impl TranscoderApi for OfflineClient {
        async fn create_preset(&self, _request: CreatePresetRequest) -> CommonResult<CreatePresetResponse> {
            Err(Error::service("CreatePreset", "offline"))
        }

        async fn read_preset(&self, _id: &str) -> CommonResult<Preset> {
            Err(Error::service("ReadPreset", "offline"))
        }
    }

    #[test]
    fn test_absent_groups_are_omitted() {
        let config = tree(json!({"name": "web", "container": "mp4", "audio": [], "video": null}));
        assert!(expand_audio_params(&config).is_none());
        assert!(expand_video_params(&config).is_none());
        assert!(expand_thumbnails(&config).is_none());
    }

    #[test]
    fn test_expand_audio_with_codec_options() {
        let config = tree(json!({
            "audio": [{
                "audio_packing_mode": "SingleTrack",
                "bit_rate": 320,
                "channels": 2,
                "codec": "pcm",
                "sample_rate": 44100,
                "codec_options": [{
                    "bit_depth": "24",
                    "bit_order": "LittleEndian",
                    "signed": "Signed"
                }]
            }]
        }));

        let audio = expand_audio_params(&config).unwrap();
        assert_eq!(audio.bit_rate.as_deref(), Some("320"));
        assert_eq!(audio.channels.as_deref(), Some("2"));
        assert_eq!(audio.sample_rate.as_deref(), Some("44100"));

        let opts = audio.codec_options.unwrap();
        assert_eq!(opts.bit_depth.as_deref(), Some("24"));
        assert_eq!(opts.bit_order.as_deref(), Some("LittleEndian"));
        assert_eq!(opts.profile, None);
        assert_eq!(opts.signed.as_deref(), Some("Signed"));
    }

    #[test]
    fn test_expand_audio_without_codec_options() {
        let config = tree(json!({"audio": [{"codec": "AAC", "codec_options": []}]}));
        let audio = expand_audio_params(&config).unwrap();
        assert!(audio.codec_options.is_none());
    }

    #[test]
    fn test_expand_video_reads_display_aspect_ratio_and_codec_options() {
        let config = tree(json!({
            "video": [{
                "codec": "H.264",
                "codec_options": {"Profile": "main", "Level": "3.1"},
                "display_aspect_ratio": "16:9",
                "key_frames_max_dist": "90",
                "fixed_gop": "false"
            }]
        }));

        let video = expand_video_params(&config).unwrap();
        assert_eq!(video.display_aspect_ratio.as_deref(), Some("16:9"));
        assert_eq!(video.keyframes_max_dist.as_deref(), Some("90"));
        assert_eq!(video.codec_options.get("Profile").map(String::as_str), Some("main"));
        assert_eq!(video.codec_options.len(), 2);
        assert!(video.watermarks.is_empty());
    }

    #[test]
    fn test_identical_watermarks_collapse() {
        let mark = json!({"id": "logo", "horizontal_align": "Right", "opacity": "50"});
        let config = tree(json!({"watermarks": [mark.clone(), mark, {"id": "bug"}]}));

        let marks = expand_watermarks(&config);
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].horizontal_align.as_deref(), Some("Right"));
        assert_eq!(marks[1].id.as_deref(), Some("bug"));
    }

    #[test]
    fn test_flatten_thumbnails_keeps_interval() {
        let thumbs = Thumbnails {
            format: Some("png".to_string()),
            interval: Some("120".to_string()),
            resolution: Some("192x108".to_string()),
            ..Default::default()
        };

        let flat = flatten_thumbnails(&thumbs);
        let member = &flat.as_list().unwrap()[0];
        assert_eq!(get_string_attr(member, "interval"), "120");
        assert_eq!(get_string_attr(member, "resolution"), "192x108");
        assert!(member.get("thumbs").is_none());
        assert!(member.get("aspect_ratio").is_none());
    }

    #[test]
    fn test_flatten_video_keeps_sizing_policy() {
        let video = VideoParameters {
            codec: Some("H.264".to_string()),
            sizing_policy: Some("ShrinkToFit".to_string()),
            ..Default::default()
        };

        let flat = flatten_video_params(&video);
        let member = &flat.as_list().unwrap()[0];
        assert_eq!(get_string_attr(member, "sizing_policy"), "ShrinkToFit");
        assert!(member.get("watermarks").is_none());
        assert!(member.get("codec_options").is_none());
    }

    #[test]
    fn test_flatten_audio_round_trips_expand() {
        let config = tree(json!({
            "audio": [{
                "codec": "pcm",
                "codec_options": [{"bit_depth": "16", "bit_order": "LittleEndian"}]
            }]
        }));

        let audio = expand_audio_params(&config).unwrap();
        assert_eq!(&flatten_audio_params(&audio), config.get("audio").unwrap());
    }

    #[tokio::test]
    async fn test_update_always_fails() {
        let mut data = ResourceData::from_state(&tree(json!({"id": "1", "name": "web"})));
        let err = PresetResource::update(&OfflineClient, &mut data).await.unwrap_err();

        match err.downcast_ref::<Error>() {
            Some(Error::UpdateUnsupported { kind }) => assert_eq!(kind, PRESET_RESOURCE_TYPE),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(data.id(), "1");
    }

    #[tokio::test]
    async fn test_delete_never_contacts_service() {
        let mut data = ResourceData::from_state(&tree(json!({"id": "1"})));
        assert!(PresetResource::delete(&OfflineClient, &mut data).await.is_ok());

        let mut empty = ResourceData::default();
        assert!(PresetResource::delete(&OfflineClient, &mut empty).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_failure_is_wrapped() {
        let mut data = ResourceData::new(&tree(json!({"name": "web", "container": "mp4"})));
        let err = PresetResource::create(&OfflineClient, &mut data).await.unwrap_err();

        assert_eq!(err.to_string(), "Error creating Elastic Transcoder Preset");
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Service { .. })));
        assert_eq!(data.id(), "");
    }

    #[tokio::test]
    async fn test_create_rejects_missing_required_attributes() {
        for config in [
            json!({"container": "mp4"}),
            json!({"name": "web", "container": ""}),
        ] {
            let mut data = ResourceData::new(&tree(config));
            // OfflineClient would fail with a service error if it were reached
            let err = PresetResource::create(&OfflineClient, &mut data).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<Error>(),
                Some(Error::MissingAttribute { .. })
            ));
            assert_eq!(data.id(), "");
        }
    }
}
