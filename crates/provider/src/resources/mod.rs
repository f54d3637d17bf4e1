//! Resource Implementations
//!
//! Implements the lifecycle operations for each resource type.

pub mod preset;

use anyhow::Result;
use crate::client::TranscoderApi;
use crate::schema::Schema;
use crate::state::ResourceData;

/// Trait for resource operations
///
/// Handlers read their configuration from `data` and record the outcome in
/// it. Clearing the identifier tells the host the resource no longer exists.
#[async_trait::async_trait]
pub trait Resource {
    /// Resource type name
    fn type_name() -> &'static str;

    /// Attribute schema
    fn schema() -> Schema;

    /// Create a new resource
    async fn create(client: &dyn TranscoderApi, data: &mut ResourceData) -> Result<()>;

    /// Refresh an existing resource
    async fn read(client: &dyn TranscoderApi, data: &mut ResourceData) -> Result<()>;

    /// Update an existing resource in place
    async fn update(client: &dyn TranscoderApi, data: &mut ResourceData) -> Result<()>;

    /// Delete a resource
    async fn delete(client: &dyn TranscoderApi, data: &mut ResourceData) -> Result<()>;
}
