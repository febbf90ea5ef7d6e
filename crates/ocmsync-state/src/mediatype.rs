//! Closed sets of recognized media types
//!
//! Every media type read from a manifest is classified through one of the
//! enums here. Anything outside the set is rejected at the classification
//! step, so adding an encoding is a change to this file only.

use crate::error::{StateError, StateResult};

/// File name of the descriptor inside the tar-wrapped encoding
pub const COMPONENT_DESCRIPTOR_FILE_NAME: &str = "component-descriptor.yaml";

/// Config blob media types of component artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigMediaType {
    /// Written by this crate
    Current,
    /// Accepted on read only
    Legacy,
}

impl ConfigMediaType {
    /// Textual media type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "application/vnd.ocm.software.component.config.v1+json",
            Self::Legacy => "application/vnd.gardener.cloud.cnudie.component.config.v1+json",
        }
    }

    /// Recognize a config media type
    #[must_use]
    pub fn parse(media_type: &str) -> Option<Self> {
        [Self::Current, Self::Legacy]
            .into_iter()
            .find(|m| m.as_str() == media_type)
    }
}

/// What a manifest config media type says about the artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigKind {
    /// No config media type: nothing stored yet
    Absent,
    /// A component artifact
    Component(ConfigMediaType),
    /// Some other kind of artifact
    Foreign(String),
}

impl ConfigKind {
    /// Classify a config media type (empty means absent)
    #[must_use]
    pub fn classify(media_type: &str) -> Self {
        if media_type.is_empty() {
            return Self::Absent;
        }
        ConfigMediaType::parse(media_type)
            .map_or_else(|| Self::Foreign(media_type.to_string()), Self::Component)
    }
}

/// Encodings of the descriptor layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerMediaType {
    /// Plain JSON
    Json,
    /// Plain YAML
    Yaml,
    /// Single-entry tar, the only form written
    Tar,
    /// Single-entry tar under the legacy media type
    LegacyTar,
}

impl LayerMediaType {
    const ALL: [Self; 4] = [Self::Json, Self::Yaml, Self::Tar, Self::LegacyTar];

    /// Textual media type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/vnd.ocm.software.component-descriptor.v2+json",
            Self::Yaml => "application/vnd.ocm.software.component-descriptor.v2+yaml",
            Self::Tar => "application/vnd.ocm.software.component-descriptor.v2+yaml+tar",
            Self::LegacyTar => {
                "application/vnd.gardener.cloud.cnudie.component-descriptor.v2+yaml+tar"
            }
        }
    }

    /// Recognize a layer media type
    ///
    /// # Errors
    /// Returns [`StateError::InvalidMediaType`] for anything outside the set
    pub fn parse(media_type: &str) -> StateResult<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == media_type)
            .ok_or_else(|| StateError::InvalidMediaType(media_type.to_string()))
    }

    /// Whether the layer content is a tar archive
    #[inline]
    #[must_use]
    pub const fn is_tar(self) -> bool {
        matches!(self, Self::Tar | Self::LegacyTar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_empty_is_absent() {
        assert_eq!(ConfigKind::classify(""), ConfigKind::Absent);
    }

    #[test]
    fn classify_both_component_config_types() {
        assert_eq!(
            ConfigKind::classify(ConfigMediaType::Current.as_str()),
            ConfigKind::Component(ConfigMediaType::Current)
        );
        assert_eq!(
            ConfigKind::classify(ConfigMediaType::Legacy.as_str()),
            ConfigKind::Component(ConfigMediaType::Legacy)
        );
    }

    #[test]
    fn classify_other_config_is_foreign() {
        let image = "application/vnd.oci.image.config.v1+json";
        assert_eq!(
            ConfigKind::classify(image),
            ConfigKind::Foreign(image.to_string())
        );
    }

    #[test]
    fn layer_media_types_parse_back() {
        for m in LayerMediaType::ALL {
            assert_eq!(LayerMediaType::parse(m.as_str()).unwrap(), m);
        }
    }

    #[test]
    fn unknown_layer_media_type_is_error() {
        assert!(matches!(
            LayerMediaType::parse("application/octet-stream"),
            Err(StateError::InvalidMediaType(m)) if m == "application/octet-stream"
        ));
    }

    #[test]
    fn only_tar_forms_are_tar() {
        assert!(LayerMediaType::Tar.is_tar());
        assert!(LayerMediaType::LegacyTar.is_tar());
        assert!(!LayerMediaType::Json.is_tar());
        assert!(!LayerMediaType::Yaml.is_tar());
    }
}
