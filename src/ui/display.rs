//! Line-oriented text output on a monochrome panel.
//!
//! The panel shows a handful of short lines. Vertical space is split evenly
//! between however many lines a screen has; each line is either centred or
//! left aligned.

use embedded_graphics::mono_font::iso_8859_1::FONT_6X10;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use crate::error::Result;

/// Longest line we keep (the 128 px panel fits 21 glyphs).
pub const LINE_CAPACITY: usize = 32;

/// Most lines a single screen may carry.
pub const MAX_LINES: usize = 4;

pub type Line = heapless::String<LINE_CAPACITY>;
pub type Lines = heapless::Vec<Line, MAX_LINES>;

/// Font used for every screen. ISO 8859-1 so the degree sign renders.
pub const FONT: MonoFont<'static> = FONT_6X10;

/// Build a line, truncating at `LINE_CAPACITY` bytes on a char boundary.
pub fn line(text: &str) -> Line {
    let mut out = Line::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Build a screen's worth of lines. Lines past `MAX_LINES` are dropped.
pub fn lines(texts: &[&str]) -> Lines {
    texts.iter().take(MAX_LINES).map(|t| line(t)).collect()
}

/// The Display collaborator used by the orchestrator.
pub trait TextDisplay {
    /// Replace the panel contents with `lines`.
    fn render(&mut self, lines: &[Line], center: bool) -> Result<()>;

    /// Power the panel up, showing the last rendered content again.
    fn power_on(&mut self) -> Result<()>;

    fn power_off(&mut self) -> Result<()>;

    fn is_powered(&self) -> bool;
}

/// Top-left corner of line `index` out of `count` on a panel of `size`.
pub fn line_origin(index: usize, count: usize, text_width: u32, size: Size, center: bool) -> Point {
    let i = index as i32;
    let n = count.max(1) as i32;
    let x = if center {
        size.width as i32 / 2 - text_width as i32 / 2
    } else {
        0
    };
    let y = i * size.height as i32 / n + i;
    Point::new(x, y)
}

/// Width in pixels of `text` in `FONT`.
pub fn text_width(text: &str) -> u32 {
    let advance = FONT.character_size.width + FONT.character_spacing;
    text.chars().count() as u32 * advance
}

/// Draw `lines` onto `target`, evenly spaced from the top.
pub fn draw_lines<D>(target: &mut D, lines: &[Line], center: bool) -> core::result::Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let size = target.bounding_box().size;
    let style = MonoTextStyle::new(&FONT, BinaryColor::On);

    for (index, text) in lines.iter().enumerate() {
        let origin = line_origin(index, lines.len(), text_width(text), size, center);
        Text::with_baseline(text, origin, style, Baseline::Top).draw(target)?;
    }
    Ok(())
}
