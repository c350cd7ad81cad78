use std::io::Read;

use artifact_model::HeaderInfo;

use crate::error::Error;

/// Payload sink collaborator consumed by the reader (§6). The reader calls
/// these in the exact order they appear in the artifact and holds no
/// payload data in memory beyond what the storer itself buffers — this is
/// what lets a multi-GB rootfs payload stream straight onto a device
/// without a bounded-memory surprise (§9 Design Notes).
pub trait UpdateStorer {
    fn initialize(&mut self, header: &HeaderInfo) -> Result<(), Error>;
    fn prepare_store_update(&mut self) -> Result<(), Error>;
    fn store_update(&mut self, reader: &mut dyn Read, name: &str, size: u64) -> Result<(), Error>;
    fn finish_store_update(&mut self) -> Result<(), Error>;
}

/// A storer that discards every byte it is handed, keeping only the names
/// and sizes it observed. Useful for inspection-only reads and as the
/// default in integration tests that only care about structural/signature
/// validation.
#[derive(Debug, Default)]
pub struct DiscardingStorer {
    pub observed: Vec<(String, u64)>,
}

impl UpdateStorer for DiscardingStorer {
    fn initialize(&mut self, _header: &HeaderInfo) -> Result<(), Error> {
        Ok(())
    }

    fn prepare_store_update(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn store_update(&mut self, reader: &mut dyn Read, name: &str, size: u64) -> Result<(), Error> {
        std::io::copy(reader, &mut std::io::sink())?;
        self.observed.push((name.to_string(), size));
        Ok(())
    }

    fn finish_store_update(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
