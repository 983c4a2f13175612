//! SHA-256 verification of artifacts already on disk.

use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use tengen_core::error::{ProvisionError, ProvisionResult};

const READ_CHUNK_BYTES: usize = 1024 * 1024;

/// Compute the SHA-256 of a file as a lowercase hex string.
///
/// Hashing a multi-gigabyte model would stall the runtime, so the read
/// loop runs on the blocking thread pool.
pub async fn sha256_file(path: &Path) -> ProvisionResult<String> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || hash_sync(&path))
        .await
        .map_err(|err| ProvisionError::Io {
            kind: "TaskJoin".to_string(),
            message: err.to_string(),
        })?
}

fn hash_sync(path: &Path) -> ProvisionResult<String> {
    let mut file = std::fs::File::open(path).map_err(|err| ProvisionError::from_io_error(&err))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|err| ProvisionError::from_io_error(&err))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
