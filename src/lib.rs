#![no_std]
//! Driver for HD44780 compatible character LCDs wired to an I2C "backpack" expander (PCF8574 and
//! friends) in 4-bit mode. It requires an I2C instance implementing [`embedded_hal::i2c::I2c`]
//! and an instance to delay execution with [`embedded_hal::delay::DelayNs`].
//!
//! Every controller byte is split into two nibble frames. Each frame carries the register select
//! bit and the current backlight state, and is latched by pulsing the enable line:
//!
//! ```text
//!  bit:   7   6   5   4   3          2       1    0
//!        D7  D6  D5  D4  backlight  enable  rw   rs
//! ```
//!
//! Usage:
//! ```ignore
//! use lcd_hd44780_i2c::{sync_lcd::Lcd, Addressing};
//!
//! let mut lcd = Lcd::new(&mut i2c, &mut delay)
//!     .with_address(0x27) // address depends on the backpack jumpers
//!     .with_addressing(Addressing::FourLine)
//!     .with_columns(20)
//!     .with_rows(4)
//!     .init()?;
//!
//! lcd.set_cursor(2, 3)?;
//! lcd.print(format_args!("T={}C", 21))?;
//!
//! // Glyphs live in CGRAM, select a DDRAM address again before printing.
//! lcd.create_char(0, &[0x0e, 0x11, 0x11, 0x11, 0x1f, 0x1b, 0x1b, 0x1f])?;
//! lcd.set_cursor(0, 0)?;
//! lcd.write_char('\u{0}')?;
//! ```
//!
//! Crate features:
//! - `async`: [`async_lcd::Lcd`], the same driver on top of `embedded-hal-async`.
//! - `defmt`: logging and [`defmt::Format`] for errors and configuration.

pub mod config;
pub mod error;
pub mod text;

pub mod sync_lcd;

#[cfg(feature = "async")]
pub mod async_lcd;

pub use config::{Addressing, Config};
pub use error::{ConfigError, Error};
pub use text::{TextBuffer, PRINT_CAPACITY};

/// Enable line of the backpack, latches the data lines on its falling edge.
pub const ENABLE_BIT: u8 = 0x04;

/// Initialization progress of a display handle.
///
/// `init` consumes the handle while the cold start sequence runs and only hands it back once the
/// controller is ready, so there is no observable in-between state. Changing the setup through a
/// `with_*` builder drops a handle back to `Uninitialized`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Uninitialized,
    Ready,
}

pub enum DisplayControl {
    Off = 0x00,
    CursorBlink = 0x01,
    CursorOn = 0x02,
    DisplayOn = 0x04,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Backlight {
    Off = 0x00,
    On = 0x08,
}

impl From<bool> for Backlight {
    fn from(on: bool) -> Self {
        if on {
            Backlight::On
        } else {
            Backlight::Off
        }
    }
}

/// Register select, i.e. whether a byte is an instruction or display data.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Cmd = 0x00,
    Data = 0x01,
}

#[repr(u8)]
#[derive(Copy, Clone)]
enum Instruction {
    EntrySet = 0x04,
    DisplayControl = 0x08,
    CursorShift = 0x10,
    FunctionSet = 0x20,
    CGRAMAddr = 0x40,
    DDRAMAddr = 0x80,
}

enum Commands {
    Clear = 0x01,
    ReturnHome = 0x02,
}

enum BitMode {
    Bit4 = 0x0 << 4,
    Bit8 = 0x1 << 4,
}

#[allow(dead_code)]
#[repr(u8)]
#[derive(Copy, Clone)]
enum Lines {
    One = 0x00,
    Two = 0x08,
}

#[allow(dead_code)]
#[repr(u8)]
#[derive(Copy, Clone)]
enum Font {
    Font5x8 = 0x00,
    Font5x10 = 0x04,
}

#[allow(dead_code)]
#[repr(u8)]
#[derive(Copy, Clone)]
enum CursorMoveDir {
    Right = 0x00,
    Left = 0x02,
}

#[allow(dead_code)]
#[repr(u8)]
#[derive(Copy, Clone)]
enum DisplayShift {
    Decrement = 0x00,
    Increment = 0x01,
}

#[repr(u8)]
#[derive(Copy, Clone)]
enum ShiftTarget {
    Cursor = 0x00,
    Display = 0x08,
}

#[repr(u8)]
#[derive(Copy, Clone)]
enum ShiftDir {
    Left = 0x00,
    Right = 0x04,
}

/// The controller powers up in 8 bit mode. Sent as a full byte the low nibble of these carries the
/// upper half of the function set instruction, which is all an 8 bit controller samples.
const INIT_8BIT: u8 = (Instruction::FunctionSet as u8 | BitMode::Bit8 as u8) >> 4;
const INIT_4BIT: u8 = (Instruction::FunctionSet as u8 | BitMode::Bit4 as u8) >> 4;

/// Number of glyphs the CGRAM holds.
pub const GLYPH_SLOTS: u8 = 8;

/// Split `value` into the high and low nibble frames, in transmission order.
pub fn encode(value: u8, mode: Mode, backlight: Backlight) -> [u8; 2] {
    let ctrl = mode as u8 | backlight as u8;
    [ctrl | (value & 0xf0), ctrl | ((value << 4) & 0xf0)]
}

/// Bus writes latching one frame: data setup, enable high, enable low.
pub fn strobe_sequence(frame: u8) -> [u8; 3] {
    [frame, frame | ENABLE_BIT, frame & !ENABLE_BIT]
}

fn function_set(lines: Lines, font: Font) -> u8 {
    Instruction::FunctionSet as u8 | BitMode::Bit4 as u8 | lines as u8 | font as u8
}

fn entry_mode(dir: CursorMoveDir, shift: DisplayShift) -> u8 {
    Instruction::EntrySet as u8 | dir as u8 | shift as u8
}

/// The display is always switched on, blinking needs a visible cursor.
fn display_control(cursor_on: bool, cursor_blink: bool) -> u8 {
    let mut ctrl = DisplayControl::DisplayOn as u8;
    if cursor_on {
        ctrl |= DisplayControl::CursorOn as u8;
        if cursor_blink {
            ctrl |= DisplayControl::CursorBlink as u8;
        }
    }
    Instruction::DisplayControl as u8 | ctrl
}

fn shift(target: ShiftTarget, dir: ShiftDir) -> u8 {
    Instruction::CursorShift as u8 | target as u8 | dir as u8
}

fn set_cgram_address(location: u8) -> Option<u8> {
    if location < GLYPH_SLOTS {
        Some(Instruction::CGRAMAddr as u8 | (location << 3))
    } else {
        None
    }
}

fn set_ddram_address(address: u8) -> u8 {
    Instruction::DDRAMAddr as u8 | (address & 0x7f)
}

/// Instruction bytes of the cold start sequence, in order.
fn init_sequence() -> [u8; 8] {
    [
        INIT_8BIT,
        INIT_8BIT,
        INIT_8BIT,
        INIT_4BIT,
        function_set(Lines::Two, Font::Font5x10),
        display_control(false, false),
        entry_mode(CursorMoveDir::Left, DisplayShift::Decrement),
        Commands::Clear as u8,
    ]
}
