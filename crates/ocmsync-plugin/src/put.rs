//! `upload put`: store stdin at an upload target
//!
//! Protocol: on success exactly one JSON line (the access specification)
//! is written to the output; on failure nothing is written to it.

use crate::error::{PluginError, PluginResult};
use crate::plugin::{Credentials, Plugin, UploadRequest};
use clap::Args;
use serde_json::Value as JsonValue;
use std::io::{Read, Write};

/// Arguments of `upload put`
#[derive(Args, Debug, Clone, Default)]
pub struct PutArgs {
    /// Credentials as a YAML string map
    #[arg(short = 'c', long = "credentials", value_name = "YAML")]
    pub credentials: Option<String>,

    /// Single credential property, repeatable
    #[arg(short = 'C', long = "credential", value_name = "KEY=VALUE")]
    pub credential: Vec<String>,

    /// Media type of the uploaded artifact
    #[arg(short = 'm', long = "mediaType", default_value = "")]
    pub media_type: String,

    /// Type of the uploaded artifact
    #[arg(short = 'a', long = "artifactType", default_value = "")]
    pub artifact_type: String,

    /// Reference hint for the uploaded artifact
    #[arg(short = 'H', long = "hint", default_value = "")]
    pub hint: String,

    /// Uploader name
    pub name: String,

    /// Repository specification (YAML or JSON)
    pub specification: String,
}

impl PutArgs {
    /// Parse the repository specification argument
    pub fn specification(&self) -> PluginResult<JsonValue> {
        serde_yaml::from_str(&self.specification).map_err(PluginError::InvalidSpecification)
    }

    /// Merge `--credentials` with `--credential` entries, the latter winning
    pub fn credentials(&self) -> PluginResult<Credentials> {
        let mut creds = match self.credentials.as_deref() {
            Some(yaml) if !yaml.trim().is_empty() => {
                serde_yaml::from_str(yaml).map_err(PluginError::InvalidCredentials)?
            }
            _ => Credentials::new(),
        };
        for entry in &self.credential {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| PluginError::InvalidCredential(entry.clone()))?;
            creds.insert(key.to_string(), value.to_string());
        }
        Ok(creds)
    }
}

/// Run `upload put`, reading the blob from `input` and reporting to `output`
///
/// # Errors
/// Returns an error for an invalid specification or credentials, an
/// unaccepted target type, an unknown uploader, or a failed upload.
pub fn run_put(
    plugin: &Plugin,
    args: &PutArgs,
    mut input: impl Read,
    mut output: impl Write,
) -> PluginResult<()> {
    let raw = args.specification()?;
    let credentials = args.credentials()?;

    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    let target = plugin.decode_upload_target_specification(&raw)?;
    let uploader = plugin
        .get_uploader(&args.name)
        .ok_or_else(|| PluginError::uploader_not_found(&args.artifact_type, &args.media_type))?;

    tracing::debug!(
        "Uploading {} bytes via {} to {}",
        data.len(),
        uploader.name(),
        target.target_type()
    );
    let request = UploadRequest {
        artifact_type: &args.artifact_type,
        media_type: &args.media_type,
        hint: &args.hint,
        target: &target,
        credentials: &credentials,
        data: &data,
    };
    let access = uploader
        .upload(plugin, &request)
        .map_err(PluginError::upload_failed)?;

    let line = serde_json::to_string(&access)?;
    writeln!(output, "{line}")?;
    output.flush()?;
    Ok(())
}
