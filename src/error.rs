//! Error types for the LCD driver.

use core::fmt;

/// Rejected [`Config`](crate::Config) values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
pub enum ConfigError {
    /// I2C addresses are 7 bit.
    InvalidAddress(u8),
    InvalidColumns(u8),
    /// Zero rows, or more than the addressing mode can reach.
    InvalidRows(u8),
    ZeroStrobeDelay,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidAddress(a) => write!(f, "Invalid I2C address {:#04x}", a),
            ConfigError::InvalidColumns(c) => write!(f, "Invalid column count {}", c),
            ConfigError::InvalidRows(r) => write!(f, "Invalid row count {}", r),
            ConfigError::ZeroStrobeDelay => write!(f, "Strobe delay must be at least 1us"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigError::InvalidAddress(a) => defmt::write!(f, "Invalid I2C address {=u8:#x}", a),
            ConfigError::InvalidColumns(c) => defmt::write!(f, "Invalid column count {}", c),
            ConfigError::InvalidRows(r) => defmt::write!(f, "Invalid row count {}", r),
            ConfigError::ZeroStrobeDelay => defmt::write!(f, "Zero strobe delay"),
        }
    }
}

/// Errors that can occur when talking to the display.
///
/// Rejected arguments never cause bus traffic.
#[derive(Debug)]
pub enum Error<E> {
    /// Underlying I2C bus error.
    I2c(E),
    Config(ConfigError),
    /// The handle has not been through [`init`](crate::sync_lcd::Lcd::init).
    NotInitialized,
    /// Row does not exist for the configured addressing.
    InvalidRow(u8),
    /// CGRAM only has slots 0 to 7.
    InvalidGlyphLocation(u8),
}

// Allow ergonomic `?` propagation from raw I2C errors.
impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2c(error)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::Config(e) => write!(f, "Invalid configuration: {}", e),
            Error::NotInitialized => write!(f, "Display not initialized"),
            Error::InvalidRow(r) => write!(f, "Invalid row {}", r),
            Error::InvalidGlyphLocation(l) => {
                write!(f, "Invalid glyph location {} (must be 0-7)", l)
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::I2c(e) => defmt::write!(f, "I2C error: {}", e),
            Error::Config(e) => defmt::write!(f, "Invalid configuration: {}", e),
            Error::NotInitialized => defmt::write!(f, "Display not initialized"),
            Error::InvalidRow(r) => defmt::write!(f, "Invalid row {}", r),
            Error::InvalidGlyphLocation(l) => defmt::write!(f, "Invalid glyph location {}", l),
        }
    }
}
