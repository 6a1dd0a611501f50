//! Linux hardware bindings.
//!
//! GPIO lines come from the character device (`/dev/gpiochip0`). The v1
//! line ABI has no bias flags, so the button's pull-up has to be set by
//! the board configuration (e.g. `gpio=20=ip,pu` in `config.txt`).

pub mod oled;

use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::CdevPin;

use crate::config::{GPIO_CHIP, GPIO_CONSUMER};
use crate::error::{Error, Result};

pub use oled::OledDisplay;

fn request(offset: u32, flags: LineRequestFlags, default: u8) -> Result<CdevPin> {
    let acquire = |reason: String| Error::LineAcquire {
        line: offset,
        reason,
    };
    let mut chip = Chip::new(GPIO_CHIP).map_err(|e| acquire(format!("{GPIO_CHIP}: {e}")))?;
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(flags, default, GPIO_CONSUMER))
        .map_err(|e| acquire(e.to_string()))?;
    CdevPin::new(handle).map_err(|e| acquire(e.to_string()))
}

/// Request `offset` as an input (the button).
pub fn input_line(offset: u32) -> Result<CdevPin> {
    request(offset, LineRequestFlags::INPUT, 0)
}

/// Request `offset` as an output, initially low (an LED channel).
pub fn output_line(offset: u32) -> Result<CdevPin> {
    request(offset, LineRequestFlags::OUTPUT, 0)
}

/// Request the three LED lines, red then green then blue.
pub fn led_lines(offsets: [u32; 3]) -> Result<[CdevPin; 3]> {
    let [r, g, b] = offsets;
    Ok([output_line(r)?, output_line(g)?, output_line(b)?])
}
