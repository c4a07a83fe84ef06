// SPDX-License-Identifier: GPL-3.0-only

//! Preview renderer
//!
//! Turns a clean frame into a display texture: scaled to a fixed height with
//! the aspect ratio preserved, flipped vertically (textures use a bottom-left
//! origin while capture rows start at the top) and expanded to RGBA.

use crate::backends::camera::types::Frame;
use image::imageops::{self, FilterType};

/// Renderable RGBA texture, rows stored bottom-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PreviewBuffer {
    /// Pixel at (`x`, `y`) counted from the top-left corner of the display
    pub fn pixel_top_down(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = self.height - 1 - y;
        let idx = (row as usize * self.width as usize + x as usize) * 4;
        self.rgba
            .get(idx..idx + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }
}

/// Width of a `width`x`height` frame scaled to `target_height`
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    if height == 0 {
        return 0;
    }
    let scaled = (width as u64 * target_height as u64 + height as u64 / 2) / height as u64;
    (scaled as u32).max(1)
}

/// Render `frame` into a texture `target_height` pixels tall
///
/// Returns `None` for frames with incomplete buffers.
pub fn render(frame: &Frame, target_height: u32) -> Option<PreviewBuffer> {
    if !frame.is_usable() || target_height == 0 {
        return None;
    }

    let image = frame.to_rgb_image()?;
    let mut scaled = if frame.height == target_height {
        image
    } else {
        let width = scaled_width(frame.width, frame.height, target_height);
        imageops::resize(&image, width, target_height, FilterType::Triangle)
    };
    imageops::flip_vertical_in_place(&mut scaled);

    let rgba = image::DynamicImage::ImageRgb8(scaled).to_rgba8();
    let (width, height) = rgba.dimensions();
    Some(PreviewBuffer {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}
