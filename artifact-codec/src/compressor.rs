use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::Error;

/// The generic compressor variants the outer TAR composes over inner
/// header/payload TARs (§4.1). Selection on write is explicit (by
/// identifier); selection on read is by suffix of the entry name, never by
/// content sniffing, to keep the reader deterministic (§9 Design Notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    Gzip,
    Lzma,
    None,
}

impl Compressor {
    pub fn from_id(id: &str) -> Result<Self, Error> {
        match id {
            "gzip" => Ok(Compressor::Gzip),
            "lzma" => Ok(Compressor::Lzma),
            "none" => Ok(Compressor::None),
            other => Err(Error::UnsupportedCompressor(other.to_string())),
        }
    }

    /// Picks the compressor whose suffix matches the given outer-TAR entry
    /// name, e.g. `header.tar.gz` -> [`Compressor::Gzip`].
    pub fn from_entry_name(name: &str) -> Result<Self, Error> {
        if name.ends_with(".gz") {
            Ok(Compressor::Gzip)
        } else if name.ends_with(".xz") {
            Ok(Compressor::Lzma)
        } else if name.ends_with(".tar") {
            Ok(Compressor::None)
        } else {
            Err(Error::UnsupportedCompressor(name.to_string()))
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Compressor::Gzip => ".gz",
            Compressor::Lzma => ".xz",
            Compressor::None => "",
        }
    }

    /// Returns a writer that can later be unwrapped back to `inner` with
    /// [`CompressorWriter::finish`] — unlike a boxed trait object, this
    /// preserves the compressor's own `finish()` so the caller can recover
    /// the underlying checksum-tee writer once the inner TAR is closed.
    pub fn writer<W: Write>(&self, inner: W) -> CompressorWriter<W> {
        match self {
            Compressor::Gzip => CompressorWriter::Gzip(GzEncoder::new(inner, Compression::default())),
            Compressor::Lzma => CompressorWriter::Lzma(XzEncoder::new(inner, 6)),
            Compressor::None => CompressorWriter::None(inner),
        }
    }

    pub fn reader<'a, R: Read + 'a>(&self, inner: R) -> Box<dyn Read + 'a> {
        match self {
            Compressor::Gzip => Box::new(GzDecoder::new(inner)),
            Compressor::Lzma => Box::new(XzDecoder::new(inner)),
            Compressor::None => Box::new(inner),
        }
    }
}

/// A compressing writer that remembers which variant produced it, so the
/// inner sink can be recovered once compression is finished.
pub enum CompressorWriter<W: Write> {
    Gzip(GzEncoder<W>),
    Lzma(XzEncoder<W>),
    None(W),
}

impl<W: Write> Write for CompressorWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressorWriter::Gzip(w) => w.write(buf),
            CompressorWriter::Lzma(w) => w.write(buf),
            CompressorWriter::None(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressorWriter::Gzip(w) => w.flush(),
            CompressorWriter::Lzma(w) => w.flush(),
            CompressorWriter::None(w) => w.flush(),
        }
    }
}

impl<W: Write> CompressorWriter<W> {
    /// Finishes compression (writing any trailer) and hands back the inner
    /// sink.
    pub fn finish(self) -> io::Result<W> {
        match self {
            CompressorWriter::Gzip(w) => w.finish(),
            CompressorWriter::Lzma(w) => w.finish(),
            CompressorWriter::None(w) => Ok(w),
        }
    }
}
