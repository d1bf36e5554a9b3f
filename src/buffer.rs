//! Block-buffered octet input and output for Fast Infoset coding.
//!
//! Fast Infoset is octet-oriented (X.891 C.1): identifier bits live inside
//! octets, but every structure starts and ends on an octet boundary. The
//! codec therefore reads and writes whole octets and composes identifier
//! bits with masks instead of keeping a bit cursor.
//!
//! Der Input-Buffer erlaubt ein begrenztes einseitiges Zurückspulen
//! innerhalb des aktuellen Blocks (für die Erkennung der optionalen
//! XML-Deklaration vor der Magic-Sequenz). Mehr Pufferung als ein Block
//! wird vom Codec nie verlangt.

use std::io::{Read, Write};

use crate::{Error, Result};

/// Block size for both directions. X.891 poses no requirement here; 4 KiB
/// keeps the rewind window comfortably larger than any header prefix.
pub(crate) const BLOCK_SIZE: usize = 4096;

/// Block-buffered octet reader over an [`std::io::Read`] source.
pub struct InputBuffer<R: Read> {
    inner: R,
    block: Vec<u8>,
    /// Leseposition innerhalb von `block`.
    pos: usize,
    /// Anzahl gültiger Bytes in `block`.
    end: usize,
}

impl<R: Read> InputBuffer<R> {
    /// Creates a buffer around `inner` with an empty block.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            block: vec![0; BLOCK_SIZE],
            pos: 0,
            end: 0,
        }
    }

    /// Refills the block from the underlying source.
    ///
    /// Verwirft den konsumierten Blockinhalt; ein `rewind` über diese
    /// Grenze hinweg ist danach nicht mehr möglich.
    fn refill(&mut self) -> Result<usize> {
        self.pos = 0;
        self.end = 0;
        loop {
            match self.inner.read(&mut self.block) {
                Ok(n) => {
                    self.end = n;
                    return Ok(n);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Reads one octet, failing with [`Error::UnexpectedEof`] at end of input.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.pos == self.end && self.refill()? == 0 {
            return Err(Error::UnexpectedEof);
        }
        let b = self.block[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Fills `buf` completely or fails with [`Error::UnexpectedEof`].
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.pos == self.end && self.refill()? == 0 {
                return Err(Error::UnexpectedEof);
            }
            let n = (self.end - self.pos).min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&self.block[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
        }
        Ok(())
    }

    /// Reads exactly `n` octets into a fresh vector.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Moves the read cursor back by `n` octets within the current block.
    ///
    /// `n` darf den seit dem letzten Refill konsumierten Bestand nicht
    /// überschreiten; der Codec spult höchstens den Magic-/Deklarations-
    /// Präfix zurück.
    pub fn rewind(&mut self, n: usize) -> Result<()> {
        if n > self.pos {
            return Err(Error::IoError(format!(
                "rewind of {n} octets exceeds buffered offset {}",
                self.pos
            )));
        }
        self.pos -= n;
        Ok(())
    }
}

/// Block-buffered octet writer over an [`std::io::Write`] sink.
pub struct OutputBuffer<W: Write> {
    inner: W,
    block: Vec<u8>,
}

impl<W: Write> OutputBuffer<W> {
    /// Creates a buffer around `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            block: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) -> Result<()> {
        if self.block.len() == BLOCK_SIZE {
            self.drain()?;
        }
        self.block.push(b);
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        // Große Payloads direkt durchreichen statt blockweise zu kopieren.
        if bytes.len() >= BLOCK_SIZE {
            self.drain()?;
            self.inner.write_all(bytes)?;
            return Ok(());
        }
        if self.block.len() + bytes.len() > BLOCK_SIZE {
            self.drain()?;
        }
        self.block.extend_from_slice(bytes);
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        if !self.block.is_empty() {
            self.inner.write_all(&self.block)?;
            self.block.clear();
        }
        Ok(())
    }

    /// Flushes the block and the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}
