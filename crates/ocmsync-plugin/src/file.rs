//! Built-in uploader storing blobs in a local directory

use crate::error::{PluginError, PluginResult};
use crate::plugin::{Plugin, UploadRequest, Uploader};
use ocmsync_blob::Digest;
use serde_json::{json, Value as JsonValue};
use std::fs;
use std::path::Path;

/// Name of the built-in file uploader
pub const FILE_UPLOADER_NAME: &str = "file";

/// Target and access specification type of the file uploader
pub const FILE_TARGET_TYPE: &str = "file/v1";

/// Writes each blob to `<path>/<sha256-hex>`
#[derive(Debug, Default, Clone, Copy)]
pub struct FileUploader;

impl Uploader for FileUploader {
    fn name(&self) -> &str {
        FILE_UPLOADER_NAME
    }

    fn target_types(&self) -> &[&str] {
        &[FILE_TARGET_TYPE]
    }

    fn upload(&self, _plugin: &Plugin, request: &UploadRequest<'_>) -> PluginResult<JsonValue> {
        let dir = Path::new(request.target.required_str("path")?);
        let digest = Digest::compute(request.data);
        let file = dir.join(digest.encoded());

        fs::create_dir_all(dir).map_err(PluginError::upload_failed)?;
        fs::write(&file, request.data).map_err(PluginError::upload_failed)?;
        tracing::info!(
            "Stored {} bytes at {}",
            request.data.len(),
            file.display()
        );

        Ok(json!({
            "type": FILE_TARGET_TYPE,
            "path": file.to_string_lossy(),
            "mediaType": request.media_type,
            "digest": digest.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Credentials;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn stores_blob_under_its_digest() {
        let dir = TempDir::new().unwrap();
        let target_dir = dir.path().join("blobs");
        let plugin = Plugin::new("test", "0").with_uploader(Arc::new(FileUploader));
        let target = plugin
            .decode_upload_target_specification(
                &json!({ "type": FILE_TARGET_TYPE, "path": target_dir }),
            )
            .unwrap();
        let creds = Credentials::new();
        let request = UploadRequest {
            artifact_type: "blob",
            media_type: "text/plain",
            hint: "",
            target: &target,
            credentials: &creds,
            data: b"hello",
        };

        let access = FileUploader.upload(&plugin, &request).unwrap();

        let digest = Digest::compute(b"hello");
        let stored = target_dir.join(digest.encoded());
        assert_eq!(fs::read(&stored).unwrap(), b"hello");
        assert_eq!(
            access,
            json!({
                "type": "file/v1",
                "path": stored.to_string_lossy(),
                "mediaType": "text/plain",
                "digest": digest.to_string(),
            })
        );
    }

    #[test]
    fn missing_path_is_a_target_error() {
        let plugin = Plugin::new("test", "0").with_uploader(Arc::new(FileUploader));
        let target = plugin
            .decode_upload_target_specification(&json!({ "type": FILE_TARGET_TYPE }))
            .unwrap();
        let creds = Credentials::new();
        let request = UploadRequest {
            artifact_type: "",
            media_type: "",
            hint: "",
            target: &target,
            credentials: &creds,
            data: b"",
        };
        assert!(matches!(
            FileUploader.upload(&plugin, &request),
            Err(PluginError::TargetSpecification(_))
        ));
    }
}
