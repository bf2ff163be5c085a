//! Named colormaps and their lookup tables

use palette::{LinSrgb, Mix, Srgb};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entries in a lookup table embedded in image layers.
pub const LUT_SIZE: usize = 256;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Hash, Default)]
pub enum Colormap {
    #[default]
    #[serde(rename = "inferno")]
    Inferno,
    #[serde(rename = "viridis")]
    Viridis,
    #[serde(rename = "inferno_r")]
    InfernoReversed,
    #[serde(rename = "kb")]
    Kb,
    #[serde(rename = "coolwarm")]
    Coolwarm,
    #[serde(rename = "coolwarm_r")]
    CoolwarmReversed,
    #[serde(rename = "Blues")]
    Blues,
    #[serde(rename = "Blues_r")]
    BluesReversed,
}

impl Colormap {
    pub const ALL: [Colormap; 8] = [
        Colormap::Inferno,
        Colormap::Viridis,
        Colormap::InfernoReversed,
        Colormap::Kb,
        Colormap::Coolwarm,
        Colormap::CoolwarmReversed,
        Colormap::Blues,
        Colormap::BluesReversed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Inferno => "inferno",
            Colormap::Viridis => "viridis",
            Colormap::InfernoReversed => "inferno_r",
            Colormap::Kb => "kb",
            Colormap::Coolwarm => "coolwarm",
            Colormap::CoolwarmReversed => "coolwarm_r",
            Colormap::Blues => "Blues",
            Colormap::BluesReversed => "Blues_r",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|colormap| colormap.name() == name)
    }

    fn stops(self) -> &'static [u32] {
        match self {
            Colormap::Inferno | Colormap::InfernoReversed => INFERNO,
            Colormap::Viridis => VIRIDIS,
            Colormap::Kb => KB,
            Colormap::Coolwarm | Colormap::CoolwarmReversed => COOLWARM,
            Colormap::Blues | Colormap::BluesReversed => BLUES,
        }
    }

    fn is_reversed(self) -> bool {
        matches!(
            self,
            Colormap::InfernoReversed | Colormap::CoolwarmReversed | Colormap::BluesReversed
        )
    }

    /// Color at `t` in `[0, 1]`, interpolated in linear light. Out-of-range
    /// and NaN inputs clamp to the ends.
    pub fn sample(self, t: f64) -> [u8; 3] {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let t = if self.is_reversed() { 1.0 - t } else { t };

        let scaled = t * (stops.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(stops.len() - 1);
        let upper = (lower + 1).min(stops.len() - 1);
        let factor = (scaled - lower as f64) as f32;

        let mixed = linear(stops[lower]).mix(linear(stops[upper]), factor);
        let encoded: Srgb<u8> = Srgb::<f32>::from_linear(mixed).into_format();
        [encoded.red, encoded.green, encoded.blue]
    }

    pub fn lut(self, size: usize) -> Vec<[u8; 3]> {
        match size {
            0 => Vec::new(),
            1 => vec![self.sample(0.0)],
            _ => (0..size)
                .map(|i| self.sample(i as f64 / (size - 1) as f64))
                .collect(),
        }
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn linear(hex: u32) -> LinSrgb {
    let [_, red, green, blue] = hex.to_be_bytes();
    Srgb::new(red, green, blue).into_format::<f32>().into_linear()
}

const INFERNO: &[u32] = &[
    0x000004, 0x1b0c41, 0x4a0c6b, 0x781c6d, 0xa52c60, 0xcf4446, 0xed6925, 0xfb9b06, 0xf7d13d,
    0xfcffa4,
];

const VIRIDIS: &[u32] = &[
    0x440154, 0x482878, 0x3e4989, 0x31688e, 0x26828e, 0x1f9e89, 0x35b779, 0x6ece58, 0xb5de2b,
    0xfde725,
];

const KB: &[u32] = &[0x000000, 0x0b1141, 0x162172, 0x1f34a3, 0x2c4ecb, 0x4a72e6, 0x7b9ef5];

const COOLWARM: &[u32] = &[
    0x3b4cc0, 0x6788ee, 0x9abbff, 0xc9d7f0, 0xedd1c2, 0xf7a889, 0xe26952, 0xb40426,
];

const BLUES: &[u32] = &[
    0xf7fbff, 0xdeebf7, 0xc6dbef, 0x9ecae1, 0x6baed6, 0x4292c6, 0x2171b5, 0x08519c, 0x08306b,
];
