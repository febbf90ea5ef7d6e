//! OCI manifest backend
//!
//! A component version is stored as a manifest whose config blob is a
//! [`ComponentDescriptorConfig`] pointing at the descriptor layer. The layer
//! may be plain JSON/YAML or tar-wrapped; writes always produce the tar form.

use crate::access::StateAccess;
use crate::error::{StateError, StateResult};
use crate::handler::ComponentStateHandler;
use crate::mediatype::{ConfigKind, ConfigMediaType, LayerMediaType};
use crate::state::{AccessMode, State};
use crate::tarball;
use ocmsync_blob::{Blob, Descriptor, Digest, ManifestAccess};
use serde::{Deserialize, Serialize};

/// Config blob of a component artifact
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptorConfig {
    /// Reference to the descriptor layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_descriptor_layer: Option<Descriptor>,
}

/// [`StateAccess`] over one OCI manifest
#[derive(Debug)]
pub struct OciStateAccess<M> {
    access: M,
}

impl<M: ManifestAccess> OciStateAccess<M> {
    /// Wrap manifest access
    #[must_use]
    pub fn new(access: M) -> Self {
        Self { access }
    }

    /// Underlying manifest access
    #[inline]
    #[must_use]
    pub fn manifest_access(&self) -> &M {
        &self.access
    }

    /// Take the manifest access out
    #[must_use]
    pub fn into_inner(self) -> M {
        self.access
    }

    fn layer_reference(&self) -> StateResult<Descriptor> {
        let config = self.access.get_config_blob()?;
        let config: ComponentDescriptorConfig =
            serde_json::from_slice(config.data()).map_err(StateError::ConfigJson)?;
        config
            .component_descriptor_layer
            .ok_or_else(|| StateError::InvalidConfig("no component descriptor layer".to_string()))
    }
}

impl<M: ManifestAccess> StateAccess for OciStateAccess<M> {
    fn get(&self) -> StateResult<Blob> {
        match ConfigKind::classify(self.access.manifest().config_media_type()) {
            ConfigKind::Absent => return Err(StateError::NotFound),
            ConfigKind::Foreign(media_type) => return Err(StateError::NotAComponent(media_type)),
            ConfigKind::Component(_) => {}
        }

        let layer = self.layer_reference()?;
        let media_type = LayerMediaType::parse(&layer.media_type)?;
        let blob = self.access.get_blob(&layer.digest)?;
        if !media_type.is_tar() {
            return Ok(blob.with_media_type(layer.media_type));
        }

        let data = tarball::unwrap(blob.data())?;
        Ok(Blob::new(LayerMediaType::Yaml.as_str(), data))
    }

    fn put(&mut self, data: &[u8]) -> StateResult<()> {
        if let ConfigKind::Foreign(media_type) =
            ConfigKind::classify(self.access.manifest().config_media_type())
        {
            return Err(StateError::NotAComponent(media_type));
        }

        let layer = Blob::new(LayerMediaType::Tar.as_str(), tarball::wrap(data)?);
        self.access.add_blob(&layer)?;

        let config = ComponentDescriptorConfig {
            component_descriptor_layer: Some(layer.descriptor()),
        };
        let config = serde_json::to_vec(&config).map_err(StateError::ConfigJson)?;
        let config = Blob::new(ConfigMediaType::Current.as_str(), config);
        self.access.add_blob(&config)?;

        let manifest = self.access.manifest_mut();
        manifest.config = Some(config.descriptor());
        match manifest.layers.first_mut() {
            Some(first) => *first = layer.descriptor(),
            None => manifest.layers.push(layer.descriptor()),
        }
        tracing::debug!("Stored component descriptor layer {}", layer.digest());
        Ok(())
    }

    fn digest(&self) -> Option<Digest> {
        self.access.get_config_blob().ok().map(|b| b.digest())
    }
}

/// Component descriptor state over an OCI manifest
pub type ComponentState<M> = State<OciStateAccess<M>, ComponentStateHandler>;

/// Build a component descriptor state over a manifest
#[must_use]
pub fn new_state<M: ManifestAccess>(
    mode: AccessMode,
    name: impl Into<String>,
    version: impl Into<String>,
    access: M,
) -> ComponentState<M> {
    State::new(
        mode,
        OciStateAccess::new(access),
        ComponentStateHandler::new(name, version),
    )
}
