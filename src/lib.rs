pub mod error;
pub use error::Error;

pub mod source;
pub use source::PayloadInput;

pub mod storer;
pub use storer::{DiscardingStorer, UpdateStorer};

pub mod augment;
pub use augment::check_type_info_conflict;

pub mod writer;
pub use writer::{write_artifact, AugmentInput, AugmentUpdateInput, UpdateInput, WriteArtifactArgs, WriterConfig};

pub mod reader;
pub use reader::{read_artifact, ArtifactSummary, ParsedUpdate, SignatureStatus};

pub use artifact_codec::sign::{KeyEncoding, PrivateKey, PublicKey, Signer, Verifier};
pub use artifact_model::{
    ArtifactDepends, ArtifactProvides, AugmentHeaderInfo, AugmentUpdate, DataFile, HeaderInfo, Info, ModuleImage, RootfsImage, Sha256Digest, TypeInfo, Update, UpdateHandler, UpdateKind, UpdateType,
};
