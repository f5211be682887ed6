use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use sha1::{Digest, Sha1};
use std::path::Path;
use titledb_model::Sha1Hex;
use tokio::io::AsyncReadExt;

const CHUNK: usize = 1024 * 1024;

/// SHA1 of a file's contents, read in 1 MiB chunks.
pub async fn sha1_file(path: &Path) -> Result<Sha1Hex> {
    let mut file = tokio::fs::File::open(path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; CHUNK];
    loop {
        let read = file.read(&mut buffer).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    let hex = format!("{:x}", hasher.finalize());
    // A SHA1 digest is always 40 hex characters.
    Sha1Hex::normalize(&hex).ok_or_raise(|| ErrorKind::Io(path.to_path_buf()))
}
