// THEORY:
// The `pixel` module is the leaf of the detection engine: the color-space converter.
// Everything above it (range matching, classification, color analysis) reasons in HSV,
// because "is this pixel roughly that green" is a question about hue, and hue survives
// the lighting gradients a product photographer puts on a template far better than raw
// RGB does.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbors. Conversions are total functions
//    over every 8-bit RGB triple; saturation is 0 when value is 0, hue is 0 for greys.
// 2) Units are the ones people type into settings: hue in degrees [0, 360), saturation
//    and value as percentages [0, 100].
// 3) `Hsv` keeps full float precision. Rounding to whole degrees/percent would make
//    `hsv_to_rgb(rgb_to_hsv(c))` drift by up to three steps per channel; `rounded()` is
//    there for display only.
// 4) `hsv_to_rgb` exists for presentation (swatch hex codes, overlay colors); the
//    detection hot path never calls it.

pub mod pixel {
    use serde::{Deserialize, Serialize};

    pub type Channel = u8;
    pub type Hue = f32;
    pub type Saturation = f32;
    pub type Value = f32;

    /// Number of bytes per pixel in every buffer this crate handles (R, G, B, A).
    pub const CHANNELS: usize = 4;

    /// Pixels with alpha below this are treated as transparent and never classified.
    pub const ALPHA_OPAQUE_THRESHOLD: Channel = 128;

    /// An 8-bit sRGB color.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Rgb {
        pub r: Channel,
        pub g: Channel,
        pub b: Channel,
    }

    /// A color in the HSV model.
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Hsv {
        /// Degrees in [0, 360).
        pub h: Hue,
        /// Percent in [0, 100].
        pub s: Saturation,
        /// Percent in [0, 100].
        pub v: Value,
    }

    impl Rgb {
        pub const fn new(r: Channel, g: Channel, b: Channel) -> Self {
            Self { r, g, b }
        }

        pub fn to_hsv(self) -> Hsv {
            rgb_to_hsv(self.r, self.g, self.b)
        }

        /// `#rrggbb`, lower case.
        pub fn to_hex(self) -> String {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }

    impl From<&[u8]> for Rgb {
        /// Reads the first three bytes of an RGBA (or RGB) pixel slice.
        fn from(bytes: &[u8]) -> Self {
            Rgb::new(bytes[0], bytes[1], bytes[2])
        }
    }

    impl Hsv {
        pub const fn new(h: Hue, s: Saturation, v: Value) -> Self {
            Self { h, s, v }
        }

        pub fn to_rgb(self) -> Rgb {
            hsv_to_rgb(self.h, self.s, self.v)
        }

        pub fn to_hex(self) -> String {
            self.to_rgb().to_hex()
        }

        /// Whole degrees and whole percentages, hue folded back into [0, 360).
        pub fn rounded(self) -> (u16, u8, u8) {
            (
                (self.h.round() as u16) % 360,
                self.s.round().clamp(0.0, 100.0) as u8,
                self.v.round().clamp(0.0, 100.0) as u8,
            )
        }
    }

    /// Converts 8-bit RGB to HSV using the standard piecewise hue formula.
    pub fn rgb_to_hsv(r: Channel, g: Channel, b: Channel) -> Hsv {
        let r = r as f32 / 255.0;
        let g = g as f32 / 255.0;
        let b = b as f32 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let sector = if delta == 0.0 {
            0.0
        } else if max == r {
            ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        let mut h = (sector * 60.0).rem_euclid(360.0);
        if h >= 360.0 {
            h -= 360.0;
        }
        let s = if max == 0.0 { 0.0 } else { delta / max };

        Hsv {
            h,
            s: s * 100.0,
            v: max * 100.0,
        }
    }

    /// Converts HSV (degrees, percent, percent) back to 8-bit RGB.
    ///
    /// Hue is taken modulo 360; saturation and value are clamped to [0, 100].
    pub fn hsv_to_rgb(h: Hue, s: Saturation, v: Value) -> Rgb {
        let h = h.rem_euclid(360.0);
        let s = (s / 100.0).clamp(0.0, 1.0);
        let v = (v / 100.0).clamp(0.0, 1.0);

        let c = v * s;
        let h_prime = h / 60.0;
        let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match h_prime as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let to_channel = |value: f32| ((value + m) * 255.0).round().clamp(0.0, 255.0) as Channel;
        Rgb::new(to_channel(r), to_channel(g), to_channel(b))
    }
}
