//! Bounded formatting target for [`print`](crate::sync_lcd::Lcd::print).

use core::convert::Infallible;
use core::fmt;

use heapless::Vec;
use ufmt_write::uWrite;

/// Display cells a single print renders, anything past this is dropped.
pub const PRINT_CAPACITY: usize = 31;

/// Byte sent for characters outside the controller's 8 bit character set.
const REPLACEMENT: u8 = b'?';

/// Character ROM code for `c`.
pub fn display_byte(c: char) -> u8 {
    u8::try_from(c).unwrap_or(REPLACEMENT)
}

/// Fixed capacity text that truncates instead of failing.
///
/// Implements both [`core::fmt::Write`] and [`uWrite`], so it can be filled with `write!` or
/// `ufmt::uwrite!` and then handed to the display in one go.
#[derive(Clone, Debug, Default)]
pub struct TextBuffer {
    cells: Vec<u8, PRINT_CAPACITY>,
    truncated: bool,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `c`, returns `false` if the buffer was already full.
    pub fn push(&mut self, c: char) -> bool {
        if self.cells.push(display_byte(c)).is_err() {
            self.truncated = true;
            return false;
        }
        true
    }

    pub fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            if !self.push(c) {
                break;
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether some output did not fit.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.truncated = false;
    }
}

impl fmt::Write for TextBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl uWrite for TextBuffer {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.push_str(s);
        Ok(())
    }
}
