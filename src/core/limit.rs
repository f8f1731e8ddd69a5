//! Purpose: Byte-ceiling wrapper around an inbound request body.
//! Exports: `BodyReader`.
//! Role: Counts consumed bytes and refuses to yield more than the configured limit.
//! Invariants: A body of exactly `limit` bytes reads through cleanly; byte `limit + 1` trips the ceiling.
//! Invariants: Once tripped, every further read fails; the reader never resumes.
//! Notes: Tracks whether everything read so far is JSON whitespace, so blank bodies read as empty.

use std::io::{self, Read};

#[derive(Debug)]
pub struct BodyReader<R> {
    inner: R,
    limit: Option<u64>,
    consumed: u64,
    exceeded: bool,
    blank: bool,
}

impl<R: Read> BodyReader<R> {
    /// `limit` of `None` or `Some(0)` reads without a ceiling.
    pub fn new(inner: R, limit: Option<u64>) -> Self {
        Self {
            inner,
            limit: limit.filter(|limit| *limit > 0),
            consumed: 0,
            exceeded: false,
            blank: true,
        }
    }

    pub fn exceeded(&self) -> bool {
        self.exceeded
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// True while every byte handed out so far is JSON whitespace.
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    fn account(&mut self, bytes: &[u8]) {
        self.consumed += bytes.len() as u64;
        if self.blank {
            self.blank = bytes
                .iter()
                .all(|byte| matches!(byte, b' ' | b'\t' | b'\n' | b'\r'));
        }
    }

    fn too_large(&self) -> io::Error {
        let limit = self.limit.unwrap_or_default();
        io::Error::other(format!("request body exceeds {limit} bytes"))
    }
}

impl<R: Read> Read for BodyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.exceeded {
            return Err(self.too_large());
        }
        let Some(limit) = self.limit else {
            let n = self.inner.read(buf)?;
            self.account(&buf[..n]);
            return Ok(n);
        };
        if buf.is_empty() {
            return Ok(0);
        }

        // One byte past the ceiling is enough to tell "exactly at limit" from "over".
        let remaining = limit - self.consumed;
        let window = usize::try_from(remaining.saturating_add(1))
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let n = self.inner.read(&mut buf[..window])?;
        if n as u64 <= remaining {
            self.account(&buf[..n]);
            return Ok(n);
        }

        self.exceeded = true;
        if remaining > 0 {
            // Hand back what fits; the next call reports the overflow.
            let fits = remaining as usize;
            self.account(&buf[..fits]);
            return Ok(fits);
        }
        Err(self.too_large())
    }
}
