use crate::error::{MatteError, Result};

/// Largest hue value in the 8-bit convention (degrees / 2).
pub const HUE_MAX: u8 = 179;

/// 8-bit HSV triple. Hue is stored as degrees / 2 (0..=179), saturation and
/// value span 0..=255.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HsvColor {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl HsvColor {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

impl std::str::FromStr for HsvColor {
    type Err = String;

    /// Parses `"H,S,V"`.
    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = input.split(',').map(str::trim).collect();
        let [h, s, v] = parts[..] else {
            return Err(format!("expected H,S,V but got '{input}'"));
        };
        Ok(Self::new(
            parse_component("hue", h)?,
            parse_component("saturation", s)?,
            parse_component("value", v)?,
        ))
    }
}

fn parse_component(name: &str, raw: &str) -> std::result::Result<u8, String> {
    raw.parse::<u8>()
        .map_err(|e| format!("invalid {name} component '{raw}': {e}"))
}

/// Closed HSV box identifying the key color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChromaRange {
    pub lower: HsvColor,
    pub upper: HsvColor,
}

impl Default for ChromaRange {
    /// Tuned for a typical green screen.
    fn default() -> Self {
        Self {
            lower: HsvColor::new(37, 40, 40),
            upper: HsvColor::new(85, 255, 255),
        }
    }
}

impl ChromaRange {
    pub fn new(lower: HsvColor, upper: HsvColor) -> Result<Self> {
        let range = Self { lower, upper };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = (self.lower, self.upper);
        if lo.h > HUE_MAX || hi.h > HUE_MAX {
            return Err(MatteError::color_range(format!(
                "hue bounds must be within 0..={HUE_MAX}, got {}..={}",
                lo.h, hi.h
            )));
        }
        for (name, l, u) in [("hue", lo.h, hi.h), ("saturation", lo.s, hi.s), ("value", lo.v, hi.v)] {
            if l > u {
                return Err(MatteError::color_range(format!(
                    "lower {name} {l} exceeds upper {name} {u}"
                )));
            }
        }
        Ok(())
    }

    pub fn contains(&self, c: HsvColor) -> bool {
        (self.lower.h..=self.upper.h).contains(&c.h)
            && (self.lower.s..=self.upper.s).contains(&c.s)
            && (self.lower.v..=self.upper.v).contains(&c.v)
    }
}

pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> HsvColor {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = f32::from(max - min);

    let s = if max == 0 {
        0
    } else {
        (diff * 255.0 / f32::from(max)).round() as u8
    };

    let h = if max == min {
        0
    } else {
        let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
        let half_degrees = if max == r {
            30.0 * (gf - bf) / diff
        } else if max == g {
            30.0 * (bf - rf) / diff + 60.0
        } else {
            30.0 * (rf - gf) / diff + 120.0
        };
        // halves round up, so -0.5 lands on 0
        let mut h = (half_degrees + 0.5).floor() as i32;
        if h < 0 {
            h += 180;
        }
        if h >= 180 {
            h -= 180;
        }
        h as u8
    };

    HsvColor::new(h, s, max)
}
