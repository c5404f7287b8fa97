use core::fmt::{self, Write as _};

use embedded_hal_async::{delay::DelayNs, i2c::I2c};

use crate::config::{Addressing, Config};
use crate::error::Error;
use crate::sync_lcd::{HOME_DELAY_MS, POWER_ON_DELAY_MS};
use crate::text::{display_byte, TextBuffer};
use crate::{
    display_control, encode, init_sequence, set_cgram_address, set_ddram_address, shift,
    strobe_sequence, Backlight, Commands, Mode, ShiftDir, ShiftTarget, State,
};

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

    pub fn with_strobe_delay_us(mut self, delay_us: u32) -> Self {
        self.config.strobe_delay_us = delay_us;
        self.state = State::Uninitialized;
        self
    }

    pub fn with_backlight(mut self, backlight: Backlight) -> Self {
        self.backlight_state = backlight;
        self.state = State::Uninitialized;
        self
    }

    /// Initializes the hardware, see [`crate::sync_lcd::Lcd::init`].
    pub async fn init(mut self) -> Result<Self, Error<I::Error>> {
        self.config.validate().map_err(Error::Config)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("lcd {=u8:#x}: init {}", self.config.address, self.config);

        self.delay.delay_ms(POWER_ON_DELAY_MS).await;
        for byte in init_sequence() {
            self.command(byte).await?;
        }
        self.delay.delay_ms(HOME_DELAY_MS).await;

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

    async fn strobe(&mut self, frame: u8) -> Result<(), I::Error> {
        for byte in strobe_sequence(frame) {
            self.i2c.write(self.config.address, &[byte]).await?;
            self.delay.delay_us(self.config.strobe_delay_us).await;
        }
        Ok(())
    }

    async fn send(&mut self, data: u8, mode: Mode) -> Result<(), I::Error> {
        self.send_with_backlight(data, mode, self.backlight_state).await
    }

    async fn send_with_backlight(
        &mut self,
        data: u8,
        mode: Mode,
        backlight: Backlight,
    ) -> Result<(), I::Error> {
        for frame in encode(data, mode, backlight) {
            self.strobe(frame).await?;
        }
        Ok(())
    }

    async fn command(&mut self, data: u8) -> Result<(), I::Error> {
        self.send(data, Mode::Cmd).await
    }

    async fn write_bytes(&mut self, data: &[u8]) -> Result<(), Error<I::Error>> {
        for &byte in data {
            self.send(byte, Mode::Data).await?;
        }
        Ok(())
    }

    pub async fn set_backlight(&mut self, on: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        let backlight = Backlight::from(on);
        self.send_with_backlight(backlight as u8, Mode::Cmd, backlight).await?;
        // only once the backpack has seen it
        self.backlight_state = backlight;
        Ok(())
    }

    pub async fn write_char(&mut self, c: char) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.send(display_byte(c), Mode::Data).await?;
        Ok(())
    }

    /// Write string to display.
    pub async fn write_str(&mut self, data: &str) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        for c in data.chars() {
            self.send(display_byte(c), Mode::Data).await?;
        }
        Ok(())
    }

    /// Format and write at most [`PRINT_CAPACITY`](crate::PRINT_CAPACITY) characters.
    pub async fn print(&mut self, args: fmt::Arguments<'_>) -> Result<(), Error<I::Error>> {
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
        self.write_bytes(buffer.as_bytes()).await
    }

    pub async fn write_buffer(&mut self, buffer: &TextBuffer) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.write_bytes(buffer.as_bytes()).await
    }

    /// Clear the display
    pub async fn clear(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(Commands::Clear as u8).await?;
        self.delay.delay_ms(HOME_DELAY_MS).await;
        Ok(())
    }

    /// Return cursor to upper left corner, i.e. (0,0).
    pub async fn return_home(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(Commands::ReturnHome as u8).await?;
        self.delay.delay_ms(HOME_DELAY_MS).await;
        Ok(())
    }

    /// Set the cursor to (row, col). Coordinates are zero-based.
    pub async fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        let Some(address) = self.config.addressing.ddram_address(row, col) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("lcd {=u8:#x}: no row {}", self.config.address, row);
            return Err(Error::InvalidRow(row));
        };
        self.command(set_ddram_address(address)).await?;
        Ok(())
    }

    pub async fn set_cursor_visibility(
        &mut self,
        visible: bool,
        blink: bool,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(display_control(visible, blink)).await?;
        Ok(())
    }

    /// Store a 5x8 glyph in CGRAM slot `location` (0 to 7).
    pub async fn create_char(
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
        self.command(address).await?;
        self.write_bytes(pattern).await
    }

    /// Scrolls the display one char to the left
    pub async fn scroll_display_left(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(shift(ShiftTarget::Display, ShiftDir::Left)).await?;
        Ok(())
    }

    /// Scrolls the display one char to the right
    pub async fn scroll_display_right(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(shift(ShiftTarget::Display, ShiftDir::Right)).await?;
        Ok(())
    }

    /// Moves the cursor one char to the left
    pub async fn move_cursor_left(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(shift(ShiftTarget::Cursor, ShiftDir::Left)).await?;
        Ok(())
    }

    /// Moves the cursor one char to the right
    pub async fn move_cursor_right(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.command(shift(ShiftTarget::Cursor, ShiftDir::Right)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{ConfigError, PRINT_CAPACITY};
    use core::future::Future;
    use core::pin::pin;
    use core::task::{Context, Poll, Waker};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
    };
    use std::vec::Vec;

    const ADDR: u8 = 0x27;

    /// The mocks never pend, polling until ready is enough.
    fn block_on<F: Future>(fut: F) -> F::Output {
        let mut fut = pin!(fut);
        let mut cx = Context::from_waker(Waker::noop());
        loop {
            if let Poll::Ready(out) = fut.as_mut().poll(&mut cx) {
                return out;
            }
        }
    }

    fn byte(value: u8, mode: Mode, backlight: Backlight) -> Vec<I2cTransaction> {
        encode(value, mode, backlight)
            .into_iter()
            .flat_map(strobe_sequence)
            .map(|frame| I2cTransaction::write(ADDR, std::vec![frame]))
            .collect()
    }

    fn cmd(value: u8) -> Vec<I2cTransaction> {
        byte(value, Mode::Cmd, Backlight::On)
    }

    fn data(value: u8) -> Vec<I2cTransaction> {
        byte(value, Mode::Data, Backlight::On)
    }

    fn init_transactions(backlight: Backlight) -> Vec<I2cTransaction> {
        [0x03, 0x03, 0x03, 0x02, 0x2c, 0x0c, 0x06, 0x01]
            .into_iter()
            .flat_map(|b| byte(b, Mode::Cmd, backlight))
            .collect()
    }

    fn after_init(rest: Vec<I2cTransaction>) -> I2cMock {
        let mut expected = init_transactions(Backlight::On);
        expected.extend(rest);
        I2cMock::new(&expected)
    }

    #[test]
    fn init_and_print() {
        let mut rest = cmd(0x80 | 0x54);
        rest.extend("hello".bytes().flat_map(data));
        let mut i2c = after_init(rest);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay)
                .with_config(Config::four_line(ADDR, 20))
                .init()
                .await
                .unwrap();
            lcd.set_cursor(3, 0).await.unwrap();
            assert!(matches!(lcd.set_cursor(4, 0).await, Err(Error::InvalidRow(4))));
            lcd.print(format_args!("{}", "hello")).await.unwrap();
        });
        i2c.done();
    }

    #[test]
    fn glyph_and_backlight() {
        let pattern = [0x1f; 8];
        let mut rest = cmd(0x40);
        for b in pattern {
            rest.extend(data(b));
        }
        rest.extend(cmd(0x08));
        let mut i2c = after_init(rest);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay).init().await.unwrap();
            assert!(matches!(
                lcd.create_char(9, &pattern).await,
                Err(Error::InvalidGlyphLocation(9))
            ));
            lcd.create_char(0, &pattern).await.unwrap();
            lcd.set_backlight(true).await.unwrap();
        });
        i2c.done();
    }

    #[test]
    fn needs_init() {
        let mut i2c = I2cMock::new(&[]);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay);
            assert!(matches!(lcd.clear().await, Err(Error::NotInitialized)));
        });
        i2c.done();
    }

    #[test]
    fn text_operations() {
        let rest = "abcde?".bytes().flat_map(data).collect();
        let mut i2c = after_init(rest);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay).init().await.unwrap();
            lcd.write_char('a').await.unwrap();
            lcd.write_str("bc").await.unwrap();
            let mut buffer = TextBuffer::new();
            buffer.push_str("de");
            lcd.write_buffer(&buffer).await.unwrap();
            lcd.write_char('\u{2603}').await.unwrap();
        });
        i2c.done();
    }

    #[test]
    fn print_truncates() {
        let text = "0123456789012345678901234567890123456789";
        let rest = text.bytes().take(PRINT_CAPACITY).flat_map(data).collect();
        let mut i2c = after_init(rest);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay).init().await.unwrap();
            lcd.print(format_args!("{}", text)).await.unwrap();
        });
        i2c.done();
    }

    #[test]
    fn cursor_visibility() {
        let rest = [0x0e, 0x0f, 0x0c, 0x0c].into_iter().flat_map(cmd).collect();
        let mut i2c = after_init(rest);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay).init().await.unwrap();
            lcd.set_cursor_visibility(true, false).await.unwrap();
            lcd.set_cursor_visibility(true, true).await.unwrap();
            lcd.set_cursor_visibility(false, false).await.unwrap();
            // blinking needs a visible cursor
            lcd.set_cursor_visibility(false, true).await.unwrap();
        });
        i2c.done();
    }

    #[test]
    fn clear_home_and_shifts() {
        let rest = [0x01, 0x02, 0x18, 0x1c, 0x10, 0x14]
            .into_iter()
            .flat_map(cmd)
            .collect();
        let mut i2c = after_init(rest);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay).init().await.unwrap();
            lcd.clear().await.unwrap();
            lcd.return_home().await.unwrap();
            lcd.scroll_display_left().await.unwrap();
            lcd.scroll_display_right().await.unwrap();
            lcd.move_cursor_left().await.unwrap();
            lcd.move_cursor_right().await.unwrap();
        });
        i2c.done();
    }

    #[test]
    fn backlight_off_from_the_start() {
        let mut expected = init_transactions(Backlight::Off);
        expected.extend(byte(b'x', Mode::Data, Backlight::Off));
        expected.extend(byte(0x08, Mode::Cmd, Backlight::On));
        expected.extend(byte(b'y', Mode::Data, Backlight::On));
        let mut i2c = I2cMock::new(&expected);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay)
                .with_backlight(Backlight::Off)
                .init()
                .await
                .unwrap();
            lcd.write_char('x').await.unwrap();
            lcd.set_backlight(true).await.unwrap();
            assert_eq!(lcd.backlight(), Backlight::On);
            lcd.write_char('y').await.unwrap();
        });
        i2c.done();
    }

    #[test]
    fn bus_errors_are_propagated() {
        let expected =
            [I2cTransaction::write(ADDR, std::vec![0x08]).with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expected);
        let mut delay = NoopDelay;
        block_on(async {
            let lcd = Lcd::new(&mut i2c, &mut delay);
            assert!(matches!(lcd.init().await, Err(Error::I2c(ErrorKind::Other))));
        });
        i2c.done();
    }

    #[test]
    fn failed_backlight_switch_keeps_state() {
        let mut expected = init_transactions(Backlight::On);
        expected.push(I2cTransaction::write(ADDR, std::vec![0x00]).with_error(ErrorKind::Other));
        let mut i2c = I2cMock::new(&expected);
        let mut delay = NoopDelay;
        block_on(async {
            let mut lcd = Lcd::new(&mut i2c, &mut delay).init().await.unwrap();
            assert!(matches!(
                lcd.set_backlight(false).await,
                Err(Error::I2c(ErrorKind::Other))
            ));
            assert_eq!(lcd.backlight(), Backlight::On);
        });
        i2c.done();
    }

    #[test]
    fn reconfiguring_requires_init() {
        let mut i2c = after_init(Vec::new());
        let mut delay = NoopDelay;
        block_on(async {
            let lcd = Lcd::new(&mut i2c, &mut delay).init().await.unwrap();
            let mut lcd = lcd.with_address(0xff);
            assert_eq!(lcd.state(), State::Uninitialized);
            assert!(matches!(lcd.write_char('a').await, Err(Error::NotInitialized)));
            assert!(matches!(
                lcd.init().await,
                Err(Error::Config(ConfigError::InvalidAddress(0xff)))
            ));
        });
        i2c.done();
    }
}
