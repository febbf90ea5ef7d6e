//! Single-entry tar encoding of the descriptor
//!
//! Written archives are deterministic: one regular file named
//! [`COMPONENT_DESCRIPTOR_FILE_NAME`], mode `0o644`, mtime at the Unix epoch.

use crate::error::{StateError, StateResult};
use crate::mediatype::COMPONENT_DESCRIPTOR_FILE_NAME;
use std::io::{self, Read};

/// Modification time stamped on written entries
pub const TAR_MOD_TIME: u64 = 0;

/// Wrap descriptor bytes into a single-entry tar archive
///
/// # Errors
/// Returns [`StateError::TarWrite`] if the archive cannot be built
pub fn wrap(data: &[u8]) -> StateResult<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_ustar();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mtime(TAR_MOD_TIME);
    header.set_mode(0o644);
    builder
        .append_data(&mut header, COMPONENT_DESCRIPTOR_FILE_NAME, data)
        .map_err(StateError::TarWrite)?;
    builder.into_inner().map_err(StateError::TarWrite)
}

/// Extract the descriptor entry from a tar archive
///
/// The entry is matched case-sensitively after stripping leading `/`.
///
/// # Errors
/// - [`StateError::TarRead`] on malformed or truncated archives
/// - [`StateError::TarEntryMissing`] if no entry matches
pub fn unwrap(reader: impl Read) -> StateResult<Vec<u8>> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries().map_err(StateError::TarRead)? {
        let mut entry = entry.map_err(StateError::TarRead)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if name.trim_start_matches('/') != COMPONENT_DESCRIPTOR_FILE_NAME {
            continue;
        }

        let expected = entry.size();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(StateError::TarRead)?;
        if data.len() as u64 != expected {
            return Err(StateError::TarRead(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated entry: expected {expected} bytes, got {}", data.len()),
            )));
        }
        return Ok(data);
    }
    Err(StateError::TarEntryMissing)
}
