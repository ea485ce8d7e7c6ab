use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::io::{ErrorKind, Read};

/// Sentinel returned when reading past the end of the input.
///
/// Real NUL bytes in the input are not distinguished from end-of-input.
pub const EOF: u8 = b'\0';

/// Error returned when the buffer is asked for input it has discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForgottenRange {
    /// Requested index
    pub requested: usize,
    /// Minimum index still available
    pub available: usize,
    /// Number of newlines in the discarded prefix
    pub newlines_discarded: usize,
}

impl fmt::Display for ForgottenRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "forgotten range: requested index {} < {} still available",
            self.requested, self.available
        )
    }
}

impl Error for ForgottenRange {}

/// Parser state over an input stream.
///
/// Provides random access by stream index, reading more input on demand and
/// retaining everything that has not been explicitly discarded with
/// [`forget_to`](ParseState::forget_to). Indexes below the retained window
/// fail with [`ForgottenRange`]; indexes past end-of-input read as [`EOF`].
pub struct ParseState<I> {
    /// Current parsing location
    pub pos: usize,
    /// Characters currently retained
    buf: VecDeque<u8>,
    /// Stream offset of `buf[0]`
    off: usize,
    /// Newlines counted in the discarded prefix
    newlines_off: usize,
    /// Input stream characters are read from
    input: I,
}

impl<I: Read> ParseState<I> {
    /// Create a state positioned at the beginning of the input stream.
    pub fn new(input: I) -> Self {
        Self {
            pos: 0,
            buf: VecDeque::new(),
            off: 0,
            newlines_off: 0,
            input,
        }
    }

    /// Get the byte at stream index `i`, reading more input if necessary.
    ///
    /// Returns [`EOF`] for `i` past the end of the input, and an error for
    /// indexes that have been forgotten.
    pub fn at(&mut self, i: usize) -> Result<u8, ForgottenRange> {
        if i < self.off {
            return Err(self.forgotten(i));
        }

        let ii = i - self.off;
        if ii >= self.buf.len() {
            let wanted = 1 + ii - self.buf.len();
            if self.fill(wanted) < wanted {
                return Ok(EOF);
            }
        }

        Ok(self.buf[ii])
    }

    /// Iterate over up to `n` bytes starting at stream index `i`, clamped to
    /// the available input.
    ///
    /// The iterator borrows the buffer, so it cannot outlive the next
    /// mutating call.
    pub fn range(
        &mut self,
        i: usize,
        n: usize,
    ) -> Result<impl Iterator<Item = u8> + '_, ForgottenRange> {
        if i < self.off {
            return Err(self.forgotten(i));
        }

        let ib = i - self.off;
        let ie = ib + n;
        if ie > self.buf.len() {
            self.fill(ie - self.buf.len());
        }

        let ib = ib.min(self.buf.len());
        let ie = ie.min(self.buf.len());
        Ok(self.buf.iter().take(ie).skip(ib).copied())
    }

    /// Materialized form of [`range`](ParseState::range).
    pub fn string(&mut self, i: usize, n: usize) -> Result<String, ForgottenRange> {
        let bytes: Vec<u8> = self.range(i, n)?.collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Discard all retained input before stream index `i`.
    ///
    /// Later reads below `i` fail with [`ForgottenRange`]. Newlines in the
    /// discarded prefix are added to the running count the error carries.
    /// Does nothing for `i` at or below the current floor; `i` must not
    /// exceed [`max_read`](ParseState::max_read).
    pub fn forget_to(&mut self, i: usize) {
        if i <= self.off {
            return;
        }

        let ii = (i - self.off).min(self.buf.len());
        self.newlines_off += self.buf.iter().take(ii).filter(|&&b| b == b'\n').count();
        self.buf.drain(..ii);
        self.off += ii;
    }

    /// One past the highest stream index read so far.
    pub fn max_read(&self) -> usize {
        self.off + self.buf.len()
    }

    /// Number of newlines in the discarded prefix.
    pub fn newlines_discarded(&self) -> usize {
        self.newlines_off
    }

    fn forgotten(&self, requested: usize) -> ForgottenRange {
        ForgottenRange {
            requested,
            available: self.off,
            newlines_discarded: self.newlines_off,
        }
    }

    /// Read exactly up to `want` more bytes from the stream into the
    /// buffer, returning the number actually read. Never reads ahead of the
    /// request, so [`max_read`](ParseState::max_read) stays the furthest
    /// index a matcher has inspected. Stream errors other than interrupts
    /// are treated as end-of-input.
    fn fill(&mut self, want: usize) -> usize {
        let mut chunk = [0u8; 256];
        let mut got = 0;

        while got < want {
            let take = (want - got).min(chunk.len());
            match self.input.read(&mut chunk[..take]) {
                Ok(0) => break,
                Ok(n) => {
                    self.buf.extend(&chunk[..n]);
                    got += n;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }

        got
    }
}
