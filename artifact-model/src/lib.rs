mod error;
pub use error::Error;

mod hash;
pub use hash::Sha256Digest;

mod info;
pub use info::Info;

mod header_info;
pub use header_info::{ArtifactDepends, ArtifactProvides, AugmentHeaderInfo, HeaderInfo, UpdateType};

mod type_info;
pub use type_info::TypeInfo;

mod data_file;
pub use data_file::DataFile;

mod update;
pub use update::{AugmentUpdate, ModuleImage, RootfsImage, Update, UpdateHandler, UpdateKind};

pub mod scripts;
