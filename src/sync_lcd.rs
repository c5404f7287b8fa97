use core::fmt::{self, Write as _};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use ufmt_write::uWrite;

use crate::config::{Addressing, Config};
use crate::error::Error;
use crate::text::{display_byte, TextBuffer};
use crate::{
    display_control, encode, init_sequence, set_cgram_address, set_ddram_address, shift,
    strobe_sequence, Backlight, Commands, Mode, ShiftDir, ShiftTarget, State,
};

/// Wait after power on before the controller accepts anything.
pub(crate) const POWER_ON_DELAY_MS: u32 = 80;
/// Execution time of clear display and return home.
pub(crate) const HOME_DELAY_MS: u32 = 2;

/// API to write to the LCD.
pub struct Lcd<'a, I, D>
where
    I: I2c,
    D: DelayNs,
{
    i2c: &'a mut I,
    delay: &'a mut D,
    config: Config,
    backlight_state: Backlight,
    state: State,
}

impl<'a, I, D> Lcd<'a, I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Create new instance with only the I2C and delay instance, using [`Config::default`].
    pub fn new(i2c: &'a mut I, delay: &'a mut D) -> Self {
        Self {
            i2c,
            delay,
            config: Config::default(),
            backlight_state: Backlight::On,
            state: State::Uninitialized,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self.state = State::Uninitialized;
        self
    }

    /// Set the 7 bit I2C address of the backpack.
    pub fn with_address(mut self, address: u8) -> Self {
        self.config.address = address;
        self.state = State::Uninitialized;
        self
    }

    pub fn with_columns(mut self, columns: u8) -> Self {
        self.config.columns = columns;
        self.state = State::Uninitialized;
        self
    }

    pub fn with_rows(mut self, rows: u8) -> Self {
        self.config.rows = rows;
        self.state = State::Uninitialized;
        self
    }

    pub fn with_addressing(mut self, addressing: Addressing) -> Self {
        self.config.addressing = addressing;
        self.state = State::Uninitialized;
        self
    }

    /// Delay after each of the three writes of an enable strobe.
    pub fn with_strobe_delay_us(mut self, delay_us: u32) -> Self {
        self.config.strobe_delay_us = delay_us;
        self.state = State::Uninitialized;
        self
    }

    /// Backlight state used from the very first frame on.
    pub fn with_backlight(mut self, backlight: Backlight) -> Self {
        self.backlight_state = backlight;
        self.state = State::Uninitialized;
        self
    }

    /// Initializes the hardware.
    ///
    /// The controller may be in 8 bit mode or halfway through a 4 bit transfer, so it is first
    /// forced into 8 bit mode three times and then switched to 4 bit mode. After that it is set
    /// to two lines with the 5x10 font, display on without cursor, left to right entry, and
    /// cleared.
    ///
    /// Calling this on an initialized display resyncs and clears it.
    pub fn init(mut self) -> Result<Self, Error<I::Error>> {
        self.config.validate().map_err(Error::Config)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("lcd {=u8:#x}: init {}", self.config.address, self.config);

        self.delay.delay_ms(POWER_ON_DELAY_MS);
        for byte in init_sequence() {
            self.command(byte)?;
        }
        // the last instruction is clear display
        self.delay.delay_ms(HOME_DELAY_MS);

        self.state = State::Ready;
        Ok(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn backlight(&self) -> Backlight {
        self.backlight_state
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (&'a mut I, &'a mut D) {
        (self.i2c, self.delay)
    }

    fn ensure_ready(&self) -> Result<(), Error<I::Error>> {
        if self.state != State::Ready {
            #[cfg(feature = "defmt")]
            defmt::warn!("lcd {=u8:#x}: not initialized", self.config.address);
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn strobe(&mut self, frame: u8) -> Result<(), I::Error> {
        for byte in strobe_sequence(frame) {
            self.i2c.write(self.config.address, &[byte])?;
            self.delay.delay_us(self.config.strobe_delay_us);
        }
        Ok(())
    }

    fn send(&mut self, data: u8, mode: Mode) -> Result<(), I::Error> {
        self.send_with_backlight(data, mode, self.backlight_state)
    }

    fn send_with_backlight(
        &mut self,
        data: u8,
        mode: Mode,
        backlight: Backlight,
    ) -> Result<(), I::Error> {
        for frame in encode(data, mode, backlight) {
            self.strobe(frame)?;
        }
        Ok(())
    }

    fn command(&mut self, data: u8) -> Result<(), I::Error> {
        self.send(data, Mode::Cmd)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), Error<I::Error>> {
        for &byte in data {
            self.send(byte, Mode::Data)?;
        }
        Ok(())
    }

    /// Switch the backlight. The state rides along in every following frame.
    ///
    /// The state is also pushed out right away as a command byte: `0x08` when on, `0x00` when
    /// off.
    pub fn set_backlight(&mut self, on: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        let backlight = Backlight::from(on);
        self.send_with_backlight(backlight as u8, Mode::Cmd, backlight)?;
        // only once the backpack has seen it
        self.backlight_state = backlight;
        Ok(())
    }

    /// Write a single character at the cursor.
    pub fn write_char(&mut self, c: char) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.send(display_byte(c), Mode::Data)?;
        Ok(())
    }

    /// Write string to display.
    pub fn write_str(&mut self, data: &str) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        for c in data.chars() {
            self.send(display_byte(c), Mode::Data)?;
        }
        Ok(())
    }

    /// Format and write at the cursor, e.g. `lcd.print(format_args!("{}%", load))`.
    ///
    /// At most [`PRINT_CAPACITY`](crate::PRINT_CAPACITY) characters are written, the rest is
    /// dropped.
    pub fn print(&mut self, args: fmt::Arguments) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = TextBuffer::new();
        if buffer.write_fmt(args).is_err() {
            // a Display impl bailed out, show what it produced so far
            #[cfg(feature = "defmt")]
            defmt::warn!("lcd {=u8:#x}: formatting failed", self.config.address);
        }
        #[cfg(feature = "defmt")]
        if buffer.is_truncated() {
            defmt::debug!("lcd {=u8:#x}: print truncated", self.config.address);
        }
        self.write_bytes(buffer.as_bytes())
    }

    /// Write text formatted ahead of time, e.g. with `ufmt::uwrite!`.
    pub fn write_buffer(&mut self, buffer: &TextBuffer) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.write_bytes(buffer.as_bytes())
    }

    /// Clear the display
    pub fn clear(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(Commands::Clear as u8)?;
        self.delay.delay_ms(HOME_DELAY_MS);
        Ok(())
    }

    /// Return cursor to upper left corner, i.e. (0,0).
    pub fn return_home(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(Commands::ReturnHome as u8)?;
        self.delay.delay_ms(HOME_DELAY_MS);
        Ok(())
    }

    /// Set the cursor to (row, col). Coordinates are zero-based.
    ///
    /// Nothing is sent for rows the configured [`Addressing`] does not have.
    pub fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        let Some(address) = self.config.addressing.ddram_address(row, col) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("lcd {=u8:#x}: no row {}", self.config.address, row);
            return Err(Error::InvalidRow(row));
        };
        self.command(set_ddram_address(address))?;
        Ok(())
    }

    /// Show or hide the cursor. The display itself is always switched on.
    pub fn set_cursor_visibility(
        &mut self,
        visible: bool,
        blink: bool,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(display_control(visible, blink))?;
        Ok(())
    }

    /// Store a 5x8 glyph in CGRAM slot `location` (0 to 7). Print it with
    /// `write_char(char::from(location))`.
    ///
    /// Afterwards the address counter points into CGRAM, call [`set_cursor`](Self::set_cursor)
    /// before writing text again.
    pub fn create_char(
        &mut self,
        location: u8,
        pattern: &[u8; 8],
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        let Some(address) = set_cgram_address(location) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("lcd {=u8:#x}: no glyph slot {}", self.config.address, location);
            return Err(Error::InvalidGlyphLocation(location));
        };
        self.command(address)?;
        self.write_bytes(pattern)
    }

    /// Scrolls the display one char to the left
    pub fn scroll_display_left(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(shift(ShiftTarget::Display, ShiftDir::Left))?;
        Ok(())
    }

    /// Scrolls the display one char to the right
    pub fn scroll_display_right(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(shift(ShiftTarget::Display, ShiftDir::Right))?;
        Ok(())
    }

    /// Moves the cursor one char to the left
    pub fn move_cursor_left(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(shift(ShiftTarget::Cursor, ShiftDir::Left))?;
        Ok(())
    }

    /// Moves the cursor one char to the right
    pub fn move_cursor_right(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(shift(ShiftTarget::Cursor, ShiftDir::Right))?;
        Ok(())
    }
}

impl<'a, I, D> uWrite for Lcd<'a, I, D>
where
    I: I2c,
    D: DelayNs,
{
    type Error = Error<I::Error>;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.write_str(s)
    }
}
