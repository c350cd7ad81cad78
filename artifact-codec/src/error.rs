use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    UnsupportedCompressor(String),
    TarBuild(std::io::Error),
    TarParse(std::io::Error),
    SerializeHeader(artifact_model::Error),
    ParseHeader(serde_json::Error),
    DuplicateManifestPath(String),
    ManifestParse(usize, String),
    ManifestEntryMissing(String),
    ChecksumMismatch { path: String, expected: artifact_model::Sha256Digest, actual: artifact_model::Sha256Digest },
    InvalidScriptName(artifact_model::Error),
    CreateTempFile(std::io::Error),
    InvalidParentPath(PathBuf),
    Sign(crate::sign::Error),
    Verify(crate::sign::Error),
    /// A caller-supplied callback (an `UpdateStorer` method, typically)
    /// failed. The codec has no opinion on what the caller's error type
    /// looks like, so it is boxed opaquely and the caller is expected to
    /// downcast it back on the way out.
    Callback(Box<dyn std::error::Error + Send + Sync>),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::UnsupportedCompressor(id) => write!(f, "unsupported compressor: {id:?}"),
            Error::TarBuild(err) => write!(f, "failed to write TAR entry: {err}"),
            Error::TarParse(err) => write!(f, "failed to parse TAR entry: {err}"),
            Error::SerializeHeader(err) => write!(f, "failed to serialize header entry: {err}"),
            Error::ParseHeader(err) => write!(f, "failed to parse header entry: {err}"),
            Error::DuplicateManifestPath(path) => write!(f, "duplicate manifest path: {path:?}"),
            Error::ManifestParse(line, text) => write!(f, "malformed manifest line {line}: {text:?}"),
            Error::ManifestEntryMissing(path) => write!(f, "no manifest entry for {path:?}"),
            Error::ChecksumMismatch { path, expected, actual } => {
                write!(f, "checksum mismatch for {path:?}: expected {expected}, got {actual}")
            }
            Error::InvalidScriptName(err) => write!(f, "invalid script name: {err}"),
            Error::CreateTempFile(err) => write!(f, "failed to create temp file: {err}"),
            Error::InvalidParentPath(path) => write!(f, "invalid parent path: {path:?}"),
            Error::Sign(err) => write!(f, "signing failed: {err}"),
            Error::Verify(err) => write!(f, "signature verification failed: {err}"),
            Error::Callback(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<artifact_model::Error> for Error {
    fn from(err: artifact_model::Error) -> Self {
        Error::SerializeHeader(err)
    }
}
