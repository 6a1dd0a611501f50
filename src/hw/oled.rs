//! SSD1306 128×32 OLED on Linux I²C.

use linux_embedded_hal::I2cdev;
use log::info;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use crate::error::{Error, Result};
use crate::ui::display::{draw_lines, Line, Lines, TextDisplay, MAX_LINES};

type Panel =
    Ssd1306<I2CInterface<I2cdev>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>;

/// The panel plus the last frame, so power-on can restore it.
pub struct OledDisplay {
    panel: Panel,
    last: Option<(Lines, bool)>,
    powered: bool,
}

impl OledDisplay {
    /// Open `bus`, initialise the controller and clear the screen.
    pub fn open(bus: &str) -> Result<Self> {
        let i2c = I2cdev::new(bus).map_err(|_| Error::Display)?;
        let interface = I2CDisplayInterface::new(i2c);
        let mut panel = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        panel.init().map_err(|_| Error::Display)?;
        panel.clear_buffer();
        panel.flush().map_err(|_| Error::Display)?;
        info!("OLED: ready on {}", bus);

        Ok(Self {
            panel,
            last: None,
            powered: true,
        })
    }
}

impl TextDisplay for OledDisplay {
    fn render(&mut self, lines: &[Line], center: bool) -> Result<()> {
        self.last = Some((lines.iter().take(MAX_LINES).cloned().collect(), center));
        self.panel.clear_buffer();
        draw_lines(&mut self.panel, lines, center).map_err(|_| Error::Display)?;
        self.panel.flush().map_err(|_| Error::Display)
    }

    fn power_on(&mut self) -> Result<()> {
        self.panel.set_display_on(true).map_err(|_| Error::Display)?;
        self.powered = true;
        match self.last.clone() {
            Some((lines, center)) => self.render(&lines, center),
            None => Ok(()),
        }
    }

    fn power_off(&mut self) -> Result<()> {
        self.panel.set_display_on(false).map_err(|_| Error::Display)?;
        self.powered = false;
        Ok(())
    }

    fn is_powered(&self) -> bool {
        self.powered
    }
}
