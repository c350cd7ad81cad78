use artifact_model::Sha256Digest;

/// The full error taxonomy from §7: every failure the writer or reader
/// orchestrator can surface, after unwrapping whichever sub-crate raised
/// it — mirroring how `ue_rs::Error::DeltaUpdate` wraps
/// `update_format_crau::delta_update::Error`.
#[derive(Debug)]
pub enum Error {
    InvalidParameters(String),
    InvalidVersion(u32),
    SignatureRequiredVersion(u32),
    AugmentWithoutV3,
    MalformedArtifact(String),
    ManifestEntryMissing(String),
    ChecksumMismatch { path: String, expected: Sha256Digest, actual: Sha256Digest },
    InvalidSignature,
    SignFailed(artifact_codec::sign::Error),
    AugmentConflict(String),
    Io(std::io::Error),
    Compression(String),
    Codec(artifact_codec::Error),
    Model(artifact_model::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameters(msg) => write!(f, "invalid parameters: {msg}"),
            Error::InvalidVersion(version) => write!(f, "unsupported artifact version: {version}"),
            Error::SignatureRequiredVersion(version) => write!(f, "version {version} artifacts cannot be signed"),
            Error::AugmentWithoutV3 => write!(f, "augmented data requires version 3"),
            Error::MalformedArtifact(msg) => write!(f, "malformed artifact: {msg}"),
            Error::ManifestEntryMissing(path) => write!(f, "no manifest entry for {path:?}"),
            Error::ChecksumMismatch { path, expected, actual } => {
                write!(f, "checksum mismatch for {path:?}: expected {expected}, got {actual}")
            }
            Error::InvalidSignature => write!(f, "signature verification failed"),
            Error::SignFailed(err) => write!(f, "signer failed: {err}"),
            Error::AugmentConflict(msg) => write!(f, "augment data conflicts with base data: {msg}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Compression(msg) => write!(f, "compression error: {msg}"),
            Error::Codec(err) => write!(f, "{err}"),
            Error::Model(err) => write!(f, "{err}"),
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
        Error::Model(err)
    }
}

impl From<artifact_codec::Error> for Error {
    fn from(err: artifact_codec::Error) -> Self {
        match err {
            artifact_codec::Error::ManifestEntryMissing(path) => Error::ManifestEntryMissing(path),
            artifact_codec::Error::ChecksumMismatch { path, expected, actual } => Error::ChecksumMismatch { path, expected, actual },
            artifact_codec::Error::Sign(inner) => Error::SignFailed(inner),
            artifact_codec::Error::Verify(_) => Error::InvalidSignature,
            artifact_codec::Error::Io(inner) => Error::Io(inner),
            artifact_codec::Error::Callback(err) => match err.downcast::<Error>() {
                Ok(original) => *original,
                Err(err) => Error::MalformedArtifact(err.to_string()),
            },
            other => Error::Codec(other),
        }
    }
}
