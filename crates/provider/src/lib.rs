//! Transcoder Preset Provider
//!
//! This crate implements a Terraform-style resource provider for Elastic
//! Transcoder presets: schema declaration, attribute-tree expansion into
//! create requests, and flattening of remote presets back into state.

pub mod client;
pub mod config;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod state;

pub use client::{AwsTranscoderClient, TranscoderApi};
pub use config::ProviderConfig;
pub use provider::TranscoderProvider;
