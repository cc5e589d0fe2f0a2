use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

pub struct FileDigest {
    /// Hex encoded.
    pub sha256: String,
    /// Modification time captured after the content was read.
    pub mtime: std::time::SystemTime,
    /// File size in bytes.
    pub size: u64,
}

/// Computes the SHA-256 digest of a file's content.
///
/// The file is consumed as a single read-through stream in fixed-size
/// chunks, so arbitrarily large files are handled without seeking. Size
/// and mtime are captured from metadata after the read; they are recorded
/// as hints only and never used to decide whether to read content.
///
/// # Errors
/// - `DigestError::Io`: file vanished or other I/O errors
/// - `DigestError::PermissionDenied`: insufficient permissions to read the file
pub fn digest_file(path: &Path) -> Result<FileDigest, DigestError> {
    info!("Checksumming {}", path.display());

    let mut file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            DigestError::PermissionDenied(path.to_path_buf())
        } else {
            DigestError::Io(e)
        }
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(DigestError::Io)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let metadata = file.metadata().map_err(DigestError::Io)?;
    let mtime = metadata.modified().map_err(DigestError::Io)?;

    let sha256 = format!("{:x}", hasher.finalize());

    debug!("Checksum of {} is {}", path.display(), sha256);

    Ok(FileDigest {
        sha256,
        mtime,
        size: metadata.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_digest_simple_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"Hello, world!").unwrap();
        temp_file.flush().unwrap();

        let result = digest_file(temp_file.path()).unwrap();

        assert_eq!(
            result.sha256,
            "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3"
        );
        assert_eq!(result.size, 13);
    }

    #[test]
    fn test_digest_empty_file() {
        let temp_file = NamedTempFile::new().unwrap();

        let result = digest_file(temp_file.path()).unwrap();

        assert_eq!(
            result.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_large_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let content = vec![b'A'; 1024 * 1024];
        temp_file.write_all(&content).unwrap();
        temp_file.flush().unwrap();

        let result = digest_file(temp_file.path()).unwrap();

        assert_eq!(result.sha256.len(), 64);
        assert_eq!(result.size, 1024 * 1024);
    }

    #[test]
    fn test_digest_nonexistent_file() {
        let result = digest_file(Path::new("/nonexistent/file.txt"));

        assert!(result.is_err());
        match result {
            Err(DigestError::Io(_)) => {}
            _ => panic!("Expected IO error for nonexistent file"),
        }
    }

    #[test]
    fn test_digest_deterministic() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"test content").unwrap();
        temp_file.flush().unwrap();

        let result1 = digest_file(temp_file.path()).unwrap();
        let result2 = digest_file(temp_file.path()).unwrap();

        assert_eq!(result1.sha256, result2.sha256);
    }

    #[test]
    fn test_digest_differs_for_different_content() {
        let mut file_a = NamedTempFile::new().unwrap();
        file_a.write_all(b"hello").unwrap();
        file_a.flush().unwrap();

        let mut file_b = NamedTempFile::new().unwrap();
        file_b.write_all(b"hellp").unwrap();
        file_b.flush().unwrap();

        let digest_a = digest_file(file_a.path()).unwrap();
        let digest_b = digest_file(file_b.path()).unwrap();

        assert_ne!(digest_a.sha256, digest_b.sha256);
    }

    #[test]
    #[cfg(unix)]
    fn test_digest_permission_denied() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"test content").unwrap();
        temp_file.flush().unwrap();

        let mut perms = fs::metadata(temp_file.path()).unwrap().permissions();
        perms.set_mode(0o000);
        fs::set_permissions(temp_file.path(), perms).unwrap();

        let result = digest_file(temp_file.path());

        assert!(result.is_err());
        match result {
            Err(DigestError::PermissionDenied(_)) => {}
            _ => panic!("Expected PermissionDenied error for permission denied"),
        }
    }
}
