//! Resource workflows.
//!
//! Thin delegation over the resource repository: every mutation already
//! refreshes the parent entry's aggregated attributes inside the repository
//! transaction, so the pipeline only adds cache invalidation on top.

use tracing::info;

use galdex_core::defaults::PUBLISH_POINT_AWARD;
use galdex_core::{CreateResourceRequest, Resource, Result, UpdateResourceRequest};

use crate::create::{EntryPipeline, LIST_CACHE_KEY};

impl EntryPipeline {
    /// Attach a resource to an entry. The entry's kind/language/platform
    /// unions refresh in the same transaction, and the submitter is awarded
    /// publish points.
    pub async fn add_resource(&self, req: &CreateResourceRequest) -> Result<Resource> {
        let resource = self.db.resources.create(req, PUBLISH_POINT_AWARD).await?;
        self.cache.invalidate(LIST_CACHE_KEY).await;
        info!(
            subsystem = "pipeline",
            component = "resources",
            entry_id = req.entry_id,
            resource_id = resource.id,
            "resource added"
        );
        Ok(resource)
    }

    /// Edit a resource in place, refreshing the parent entry's unions.
    pub async fn edit_resource(&self, req: &UpdateResourceRequest) -> Result<Resource> {
        let resource = self.db.resources.update(req).await?;
        self.cache.invalidate(LIST_CACHE_KEY).await;
        Ok(resource)
    }

    /// Remove a resource, refreshing the parent entry's unions.
    pub async fn remove_resource(&self, resource_id: i64) -> Result<()> {
        self.db.resources.delete(resource_id).await?;
        self.cache.invalidate(LIST_CACHE_KEY).await;
        Ok(())
    }
}
