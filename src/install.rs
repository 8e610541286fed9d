//! Checksum-gated atomic install of a received payload.
//!
//! The payload lands in a staging file first and is only renamed over the
//! target once its digest matches what the sender declared, so no reader of
//! the filesystem ever observes a partially written target.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Digest, Sha1};
use tracing::{debug, info};

#[derive(Debug)]
pub enum InstallError {
    /// Payload was not valid base64
    Decode(base64::DecodeError),
    /// Target path has no basename to stage under
    BadTarget,
    /// Request declared no digest; install refused
    MissingChecksum,
    /// Digest of the staged bytes does not match the declared digest
    ChecksumMismatch { declared: String, computed: String },
    Io(std::io::Error),
}

impl From<std::io::Error> for InstallError {
    fn from(e: std::io::Error) -> Self {
        InstallError::Io(e)
    }
}

/// The one component allowed to mutate installed state.
#[derive(Debug, Clone)]
pub struct Installer {
    staging_dir: PathBuf,
}

impl Installer {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    /// Decodes `payload`, stages it, verifies it and renames it over
    /// `target`.
    ///
    /// The digest is recomputed from the staged file on disk rather than
    /// from the in-memory bytes, so a decode or write inconsistency fails
    /// verification instead of installing a corrupt file. On any failure
    /// after staging, the staged file is left in place and the target is
    /// untouched; the rename only happens after an exact digest match.
    pub fn install(
        &self,
        target: &Path,
        payload: &[u8],
        declared: Option<&str>,
    ) -> Result<(), InstallError> {
        let decoded = BASE64
            .decode(payload.trim_ascii())
            .map_err(InstallError::Decode)?;

        let name = target.file_name().ok_or(InstallError::BadTarget)?;

        fs::create_dir_all(&self.staging_dir)?;
        let staged = self.staging_dir.join(name);

        debug!("writing payload to {}", staged.display());
        fs::write(&staged, &decoded)?;

        let written = fs::read(&staged)?;
        let computed = sha1_hex(&written);

        let Some(declared) = declared else {
            return Err(InstallError::MissingChecksum);
        };

        debug!("incoming filehash: {}", declared);
        debug!(" written filehash: {}", computed);

        if declared != computed {
            return Err(InstallError::ChecksumMismatch {
                declared: declared.to_string(),
                computed,
            });
        }

        info!("hashes match, overwriting {}", target.display());
        fs::rename(&staged, target)?;

        Ok(())
    }
}

pub fn sha1_hex(data: &[u8]) -> String {
    Sha1::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
