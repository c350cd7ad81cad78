use std::io::{self, Read, Write};

use artifact_model::Sha256Digest;
use sha2::{Digest, Sha256};

/// Wraps a [`Write`] and tees every byte through a running SHA-256 state.
/// Passing [`io::sink()`] as the inner writer turns this into a pure
/// hasher, used by the writer's pre-pass over payload data (§4.5 step 1).
pub struct ChecksumWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, hasher: Sha256::new() }
    }

    /// Consumes the writer, flushing the inner sink and returning the
    /// finalized digest alongside the inner writer.
    pub fn finalize(mut self) -> io::Result<(W, Sha256Digest)> {
        self.inner.flush()?;
        Ok((self.inner, Sha256Digest::from_bytes(self.hasher.finalize().into())))
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Wraps a [`Read`] and tees every byte through a running SHA-256 state as
/// it is pulled by the caller. Used on the reader side to hash an inner
/// entry's bytes while they flow on to decompression/TAR parsing, without
/// buffering the entry in memory.
pub struct ChecksumReader<R> {
    inner: R,
    hasher: Sha256,
}

impl<R: Read> ChecksumReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, hasher: Sha256::new() }
    }

    pub fn finalize(self) -> Sha256Digest {
        Sha256Digest::from_bytes(self.hasher.finalize().into())
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// Hashes an entire reader to completion, discarding its bytes. Used for
/// the writer's data-file pre-pass when the caller's payload reader need
/// not be retained (a temp-file copy is made separately by the composer).
pub fn hash_to_end<R: Read>(mut reader: R) -> io::Result<Sha256Digest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Sha256Digest::from_bytes(hasher.finalize().into()))
}
