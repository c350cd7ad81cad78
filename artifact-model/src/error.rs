#[derive(Debug)]
pub enum Error {
    EmptyCompatibleDevices,
    EmptyArtifactName,
    ArtifactNameHasWhitespace(String),
    EmptyUpdates,
    DataFileNameHasPathSeparator(String),
    InvalidScriptName(String),
    SerializeJson(serde_json::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptyCompatibleDevices => write!(f, "compatible_devices must not be empty"),
            Error::EmptyArtifactName => write!(f, "artifact_name must not be empty"),
            Error::ArtifactNameHasWhitespace(name) => write!(f, "artifact_name {name:?} contains interior whitespace"),
            Error::EmptyUpdates => write!(f, "updates list must not be empty"),
            Error::DataFileNameHasPathSeparator(name) => write!(f, "data file name {name:?} contains a path separator"),
            Error::InvalidScriptName(name) => write!(f, "script name {name:?} does not match the required state-script pattern"),
            Error::SerializeJson(err) => write!(f, "failed to serialize JSON: {err}"),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializeJson(err)
    }
}
