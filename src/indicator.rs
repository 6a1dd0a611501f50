//! RGB status LED.
//!
//! Colours are either a palette name or an explicit RGB triple. Each 8-bit
//! component goes through a gamma table before it becomes a PWM duty
//! cycle, so perceived brightness is roughly linear.

use core::fmt;
use core::str::FromStr;

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::error::{Error, Result};

/// Gamma correction table (component value → corrected value).
#[rustfmt::skip]
pub const GAMMA: [u8; 256] = [
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   1,   1,   1,   1,
      1,   1,   1,   1,   1,   1,   1,   1,   1,   2,   2,   2,   2,   2,   2,   2,
      2,   3,   3,   3,   3,   3,   3,   3,   4,   4,   4,   4,   4,   5,   5,   5,
      5,   6,   6,   6,   6,   7,   7,   7,   7,   8,   8,   8,   9,   9,   9,  10,
     10,  10,  11,  11,  11,  12,  12,  13,  13,  13,  14,  14,  15,  15,  16,  16,
     17,  17,  18,  18,  19,  19,  20,  20,  21,  21,  22,  22,  23,  24,  24,  25,
     25,  26,  27,  27,  28,  29,  29,  30,  31,  32,  32,  33,  34,  35,  35,  36,
     37,  38,  39,  39,  40,  41,  42,  43,  44,  45,  46,  47,  48,  49,  50,  50,
     51,  52,  54,  55,  56,  57,  58,  59,  60,  61,  62,  63,  64,  66,  67,  68,
     69,  70,  72,  73,  74,  75,  77,  78,  79,  81,  82,  83,  85,  86,  87,  89,
     90,  92,  93,  95,  96,  98,  99, 101, 102, 104, 105, 107, 109, 110, 112, 114,
    115, 117, 119, 120, 122, 124, 126, 127, 129, 131, 133, 135, 137, 138, 140, 142,
    144, 146, 148, 150, 152, 154, 156, 158, 160, 162, 164, 167, 169, 171, 173, 175,
    177, 180, 182, 184, 186, 189, 191, 193, 196, 198, 200, 203, 205, 208, 210, 213,
    215, 218, 220, 223, 225, 228, 231, 233, 236, 239, 241, 244, 247, 249, 252, 255,
];

/// Fixed colour palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamedColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    White,
    /// Dark orange.
    Dark,
}

impl NamedColor {
    pub const ALL: [Self; 9] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Purple,
        Self::Pink,
        Self::White,
        Self::Dark,
    ];

    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Red => (255, 0, 0),
            Self::Orange => (255, 128, 0),
            Self::Yellow => (255, 200, 0),
            Self::Green => (0, 255, 0),
            Self::Blue => (0, 0, 255),
            Self::Purple => (127, 0, 255),
            Self::Pink => (155, 0, 127),
            Self::White => (255, 255, 255),
            Self::Dark => (153, 76, 0),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Pink => "pink",
            Self::White => "white",
            Self::Dark => "dark",
        }
    }
}

impl FromStr for NamedColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownColor(wanted.to_string()))
    }
}

/// A colour for the status LED.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Named(NamedColor),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Colour used when the program exits.
    pub const ERROR: Color = Color::Named(NamedColor::Red);

    pub const OFF: Color = Color::Rgb(0, 0, 0);

    /// Build an RGB colour, clamping each channel to 0..=255.
    pub fn clamped(r: i32, g: i32, b: i32) -> Self {
        let clamp = |v: i32| v.clamp(0, 255) as u8;
        Color::Rgb(clamp(r), clamp(g), clamp(b))
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Named(named) => named.rgb(),
            Color::Rgb(r, g, b) => (r, g, b),
        }
    }
}

impl From<NamedColor> for Color {
    fn from(named: NamedColor) -> Self {
        Color::Named(named)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Named(named) => f.write_str(named.name()),
            Color::Rgb(r, g, b) => write!(f, "{r},{g},{b}"),
        }
    }
}

/// Parses a palette name (`"green"`) or a comma separated triple
/// (`"255,128,0"`, clamped).
impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [name] => name.parse::<NamedColor>().map(Color::Named),
            [r, g, b] => {
                let channel = |v: &str| {
                    v.parse::<i32>()
                        .map_err(|_| Error::UnknownColor(s.trim().to_string()))
                };
                Ok(Color::clamped(channel(r)?, channel(g)?, channel(b)?))
            }
            _ => Err(Error::UnknownColor(s.trim().to_string())),
        }
    }
}

/// The Indicator-Color collaborator.
pub trait Indicator {
    fn set_color(&mut self, color: Color) -> Result<()>;

    fn turn_off(&mut self) -> Result<()>;
}

/// Common-cathode RGB LED on three PWM channels.
pub struct RgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
    current: Color,
}

impl<R, G, B> RgbLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    /// Take the three channels and switch the LED off.
    pub fn new(red: R, green: G, blue: B) -> Result<Self> {
        let mut led = Self {
            red,
            green,
            blue,
            current: Color::OFF,
        };
        led.turn_off()?;
        Ok(led)
    }

    pub fn current(&self) -> Color {
        self.current
    }

    fn apply(&mut self, (r, g, b): (u8, u8, u8)) -> Result<()> {
        set_channel(&mut self.red, r)?;
        set_channel(&mut self.green, g)?;
        set_channel(&mut self.blue, b)
    }
}

fn set_channel<P: SetDutyCycle>(channel: &mut P, value: u8) -> Result<()> {
    channel
        .set_duty_cycle_fraction(u16::from(GAMMA[usize::from(value)]), 255)
        .map_err(|_| Error::Pwm)
}

impl<R, G, B> Indicator for RgbLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    fn set_color(&mut self, color: Color) -> Result<()> {
        debug!("Indicator: {}", color);
        self.apply(color.rgb())?;
        self.current = color;
        Ok(())
    }

    fn turn_off(&mut self) -> Result<()> {
        self.apply((0, 0, 0))?;
        self.current = Color::OFF;
        Ok(())
    }
}
