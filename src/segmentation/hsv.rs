//! 8-bit RGB to HSV conversion.
//!
//! Hue is stored in half degrees so it fits a byte: `[0, 180)`. Saturation and
//! value span `[0, 255]`.

use image::{GrayImage, RgbImage};

/// Convert a single RGB pixel to `[hue, saturation, value]`.
#[inline]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = (max - min) as f32;

    let saturation = if max == 0 {
        0
    } else {
        (255.0 * diff / max as f32).round() as u8
    };

    if diff == 0.0 {
        return [0, saturation, max];
    }

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let mut hue = if max as f32 == r {
        30.0 * (g - b) / diff
    } else if max as f32 == g {
        60.0 + 30.0 * (b - r) / diff
    } else {
        120.0 + 30.0 * (r - g) / diff
    };
    if hue < 0.0 {
        hue += 180.0;
    }

    let hue = hue.round() as u32 % 180;
    [hue as u8, saturation, max]
}

/// The three planes of an HSV image.
#[derive(Debug, Clone)]
pub struct HsvPlanes {
    pub hue: GrayImage,
    pub saturation: GrayImage,
    pub value: GrayImage,
}

impl HsvPlanes {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut hue = GrayImage::new(width, height);
        let mut saturation = GrayImage::new(width, height);
        let mut value = GrayImage::new(width, height);

        for (x, y, pixel) in image.enumerate_pixels() {
            let [h, s, v] = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
            hue.put_pixel(x, y, image::Luma([h]));
            saturation.put_pixel(x, y, image::Luma([s]));
            value.put_pixel(x, y, image::Luma([v]));
        }

        Self {
            hue,
            saturation,
            value,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.hue.dimensions()
    }
}

/// Convert an HSV triple back to RGB. Used to render synthetic frames and the
/// histogram legend.
pub fn hsv_to_rgb(hue: u8, saturation: u8, value: u8) -> [u8; 3] {
    let h = (hue as f32 * 2.0) / 60.0;
    let s = saturation as f32 / 255.0;
    let v = value as f32;

    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [
        (r + m).round() as u8,
        (g + m).round() as u8,
        (b + m).round() as u8,
    ]
}
