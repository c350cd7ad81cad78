use crate::data_file::DataFile;
use crate::type_info::TypeInfo;

/// The capability set an update "handler" exposes (§9 Design Notes:
/// "Model as a tagged variant plus dispatch, not deep inheritance").
/// Rootfs and module-image updates differ only in how strict they are
/// about `type-info` contents and augment overlays; the writer/reader
/// orchestrators dispatch on [`UpdateKind`] rather than on a trait object
/// hierarchy.
pub trait UpdateHandler {
    /// The `type` string recorded in `type-info` and `header-info.updates`.
    fn type_name(&self) -> &str;

    /// Whether this update kind requires a non-empty `type-info.type`.
    /// Module-image updates name themselves (`module-image-foo`); a
    /// missing type is a caller error. Rootfs allows a bare `rootfs-image`.
    fn requires_explicit_type(&self) -> bool;

    /// Whether this kind permits an augment overlay to introduce a
    /// `rootfs-image.checksum` provides key it could not have known at
    /// base-build time (§4.7).
    fn allows_augment_provides(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootfsImage;

impl UpdateHandler for RootfsImage {
    fn type_name(&self) -> &str {
        "rootfs-image"
    }

    fn requires_explicit_type(&self) -> bool {
        false
    }

    fn allows_augment_provides(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    pub module_name: String,
}

impl UpdateHandler for ModuleImage {
    fn type_name(&self) -> &str {
        &self.module_name
    }

    fn requires_explicit_type(&self) -> bool {
        true
    }

    fn allows_augment_provides(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    RootfsImage(RootfsImage),
    ModuleImage(ModuleImage),
}

impl UpdateKind {
    pub fn handler(&self) -> &dyn UpdateHandler {
        match self {
            UpdateKind::RootfsImage(h) => h,
            UpdateKind::ModuleImage(h) => h,
        }
    }

    pub fn type_name(&self) -> &str {
        self.handler().type_name()
    }
}

/// One logical update: a type-info, optional meta-data, optional scripts,
/// and its data files, plus an optional augment overlay (v3 only).
#[derive(Debug, Clone)]
pub struct Update {
    pub kind: UpdateKind,
    pub type_info: TypeInfo,
    pub meta_data: serde_json::Value,
    pub scripts: Vec<String>,
    pub data_files: Vec<DataFile>,
    pub augment: Option<AugmentUpdate>,
}

impl Update {
    pub fn new(kind: UpdateKind) -> Self {
        Self {
            kind,
            type_info: TypeInfo::default(),
            meta_data: serde_json::Value::Object(Default::default()),
            scripts: Vec::new(),
            data_files: Vec::new(),
            augment: None,
        }
    }
}

/// The augment overlay for one update (§4.7): an augment type-info,
/// augment meta-data, and augment data files, recorded only in the
/// augment manifest.
#[derive(Debug, Clone, Default)]
pub struct AugmentUpdate {
    pub type_info: TypeInfo,
    pub meta_data: serde_json::Value,
    pub data_files: Vec<DataFile>,
}
