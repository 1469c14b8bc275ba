//! File-backed image source.

use crate::pipeline::data_type::TypeKind;
use crate::pipeline::error::ApplyError;
use crate::pipeline::node::{NodeContext, NodeDefinition, NodeOperation, PreviewSource};
use crate::pipeline::port::PortSpec;
use crate::pipeline::value::ImageHandle;
use async_trait::async_trait;
use std::path::Path;

/// Exposes a loaded image on its single outlet.
///
/// The node does no work of its own: whoever loads a file writes the decoded
/// handle into outlet 0 with `propagate = true`. It is created from a file
/// rather than from the add-node menu, so it is not `addable`.
#[derive(Debug, Default)]
pub struct ImageSourceNode {
    initial: Option<ImageHandle>,
}

impl ImageSourceNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `image` already on the outlet.
    pub fn with_image(image: ImageHandle) -> Self {
        Self {
            initial: Some(image),
        }
    }

    /// Read and decode an image file off the async runtime.
    pub async fn decode_file(path: impl AsRef<Path>) -> Result<ImageHandle, ApplyError> {
        let path = path.as_ref().to_path_buf();
        tracing::debug!("Decoding image {:?}", path);
        let handle = tokio::task::spawn_blocking(move || ImageHandle::open(path)).await??;
        Ok(handle)
    }
}

#[async_trait]
impl NodeOperation for ImageSourceNode {
    fn definition(&self) -> NodeDefinition {
        let mut outlet =
            PortSpec::new(TypeKind::Image, "Image").with_description("The loaded image");
        if let Some(image) = &self.initial {
            outlet = outlet.with_initial(image.clone());
        }
        NodeDefinition {
            name: "Image".to_string(),
            description: "Loads an image from a file".to_string(),
            path: NodeDefinition::parse_path("Image"),
            addable: false,
            preview: Some(PreviewSource::Outlet(0)),
            outlets: vec![outlet],
            ..NodeDefinition::default()
        }
    }

    async fn apply(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), ApplyError> {
        Ok(())
    }
}
