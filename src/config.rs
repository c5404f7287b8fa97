//! Display geometry, bus address and timing, resolved once when the handle is built.

use crate::error::ConfigError;

/// Default I2C address of PCF8574T based backpacks.
pub const DEFAULT_ADDRESS: u8 = 0x27;

/// Enable strobe setup/hold time. The controller needs far less, but slow expanders and long
/// wires are happier with the margin.
pub const DEFAULT_STROBE_DELAY_US: u32 = 600;

/// Number of DDRAM cells per line on a two line controller.
const DDRAM_LINE_LENGTH: u8 = 40;

/// Offset of rows 2 and 3 on 20x4 modules, which are lines 0 and 1 continued.
const FOUR_LINE_OFFSET: u8 = 0x14;

/// Row to DDRAM address mapping.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Addressing {
    /// Row 0 starts at `0x00`, every other row at `0x40`.
    TwoLine,
    /// Rows start at `0x00`, `0x40`, `0x14` and `0x54`. Other rows are rejected.
    FourLine,
}

impl Addressing {
    /// Highest number of rows this mapping can address.
    pub fn max_rows(self) -> u8 {
        match self {
            Addressing::TwoLine => 2,
            Addressing::FourLine => 4,
        }
    }

    /// DDRAM address of (`row`, `col`), `None` if the row does not exist.
    ///
    /// The two line mapping is permissive: any row but 0 lands on the second line.
    pub fn ddram_address(self, row: u8, col: u8) -> Option<u8> {
        let base: u8 = match self {
            Addressing::TwoLine => {
                if row == 0 {
                    0x00
                } else {
                    0x40
                }
            }
            Addressing::FourLine => match row {
                0 => 0x00,
                1 => 0x40,
                2 => FOUR_LINE_OFFSET,
                3 => 0x40 + FOUR_LINE_OFFSET,
                _ => return None,
            },
        };
        Some(base.wrapping_add(col) & 0x7f)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 7 bit I2C address of the backpack.
    pub address: u8,
    pub columns: u8,
    pub rows: u8,
    pub addressing: Addressing,
    pub strobe_delay_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            columns: 16,
            rows: 2,
            addressing: Addressing::TwoLine,
            strobe_delay_us: DEFAULT_STROBE_DELAY_US,
        }
    }
}

impl Config {
    /// 16x2 style module.
    pub fn two_line(address: u8, columns: u8) -> Self {
        Self {
            address,
            columns,
            ..Self::default()
        }
    }

    /// 20x4 style module.
    pub fn four_line(address: u8, columns: u8) -> Self {
        Self {
            address,
            columns,
            rows: 4,
            addressing: Addressing::FourLine,
            ..Self::default()
        }
    }

    pub fn with_strobe_delay_us(mut self, delay_us: u32) -> Self {
        self.strobe_delay_us = delay_us;
        self
    }

    /// Checks everything that would otherwise only show up as garbage on the glass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address > 0x7f {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if self.columns == 0 || self.columns > DDRAM_LINE_LENGTH {
            return Err(ConfigError::InvalidColumns(self.columns));
        }
        if self.rows == 0 || self.rows > self.addressing.max_rows() {
            return Err(ConfigError::InvalidRows(self.rows));
        }
        // rows 2 and 3 start 20 cells into lines 0 and 1
        if self.addressing == Addressing::FourLine && self.columns > FOUR_LINE_OFFSET {
            return Err(ConfigError::InvalidColumns(self.columns));
        }
        if self.strobe_delay_us == 0 {
            return Err(ConfigError::ZeroStrobeDelay);
        }
        Ok(())
    }
}
