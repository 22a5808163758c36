//! Storage content listings (templates, ISO images)

use tracing::debug;

use super::PveClient;
use crate::error::Result;
use crate::template::StorageContent;

impl PveClient {
    /// Content of a storage bucket on a node
    pub async fn storage_content(&self, node: &str, bucket: &str) -> Result<Vec<StorageContent>> {
        self.get_data(
            &format!("/nodes/{}/storage/{}/content", node, bucket),
            "storage content",
        )
        .await
    }

    /// Container templates in the configured template storage
    pub async fn template_list(&self, node: &str) -> Result<Vec<StorageContent>> {
        debug!(node, "Getting templates");
        self.storage_content(node, &self.config().template_storage)
            .await
    }

    /// Volume ids of the ISO images in the configured ISO storage
    pub async fn iso_list(&self, node: &str) -> Result<Vec<String>> {
        debug!(node, "Getting ISOs");
        let content = self.storage_content(node, &self.config().iso_storage).await?;
        Ok(content.into_iter().map(|iso| iso.volid).collect())
    }
}
