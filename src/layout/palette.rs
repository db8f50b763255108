//! Batch colors.
//!
//! A diverging palette built like the classic "chroma.js palette helper":
//! two half-scales (cool anchors → midpoint, midpoint → warm anchors)
//! interpolated in CIE Lab with lightness correction, concatenated with the
//! shared midpoint kept once. The result depends only on the batch count, so
//! a batch keeps its color across reloads of a same-sized recording.

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Self = Self { r: 255, g: 255, b: 255, a: 255 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to normalized f32 (for rendering)
    #[inline(always)]
    pub fn to_f32(self) -> [f32; 4] {
        const INV_255: f32 = 1.0 / 255.0;
        [
            self.r as f32 * INV_255,
            self.g as f32 * INV_255,
            self.b as f32 * INV_255,
            self.a as f32 * INV_255,
        ]
    }

    /// Blend toward `other` by `t` in sRGB space (used for dimming, not palettes).
    pub fn mix(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let m = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba {
            r: m(self.r, other.r),
            g: m(self.g, other.g),
            b: m(self.b, other.b),
            a: m(self.a, other.a),
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Hex character → 4-bit value without branching.
#[inline(always)]
fn hex_digit(b: u8) -> u8 {
    let is_digit = (b.wrapping_sub(b'0') < 10) as u8;
    let is_lower = (b.wrapping_sub(b'a') < 6) as u8;
    let is_upper = (b.wrapping_sub(b'A') < 6) as u8;

    is_digit
        .wrapping_mul(b.wrapping_sub(b'0'))
        .wrapping_add(is_lower.wrapping_mul(b.wrapping_sub(b'a').wrapping_add(10)))
        .wrapping_add(is_upper.wrapping_mul(b.wrapping_sub(b'A').wrapping_add(10)))
}

/// Parse `#RRGGBB`. Anything else is black.
pub fn parse_hex_color(s: &str) -> Rgba {
    let bytes = s.as_bytes();
    if bytes.len() != 7 || bytes[0] != b'#' {
        return Rgba::BLACK;
    }
    let byte = |i: usize| (hex_digit(bytes[i]) << 4) | hex_digit(bytes[i + 1]);
    Rgba::rgb(byte(1), byte(3), byte(5))
}

// ── Palette anchors ──

const LEFT_ANCHORS: &[&str] = &["#00429d", "#4771b2", "#73a2c6", "#a5d5d8"];
const MIDPOINT: &str = "#ffffe0";
const RIGHT_ANCHORS: &[&str] = &["#ffbcaf", "#f4777f", "#cf3759", "#93003a"];

// ── CIE Lab (D65) ──

#[derive(Debug, Clone, Copy, PartialEq)]
struct Lab {
    l: f64,
    a: f64,
    b: f64,
}

const WHITE_X: f64 = 0.950_47;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.088_83;
const LAB_EPSILON: f64 = 216.0 / 24389.0;
const LAB_KAPPA: f64 = 24389.0 / 27.0;

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        (LAB_KAPPA * t + 16.0) / 116.0
    }
}

impl Lab {
    fn from_rgba(c: Rgba) -> Self {
        let r = srgb_to_linear(c.r as f64 / 255.0);
        let g = srgb_to_linear(c.g as f64 / 255.0);
        let b = srgb_to_linear(c.b as f64 / 255.0);

        let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
        let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
        let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

        let fx = lab_f(x / WHITE_X);
        let fy = lab_f(y / WHITE_Y);
        let fz = lab_f(z / WHITE_Z);

        Lab {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }

    fn to_rgba(self) -> Rgba {
        let fy = (self.l + 16.0) / 116.0;
        let fx = fy + self.a / 500.0;
        let fz = fy - self.b / 200.0;

        let fx3 = fx * fx * fx;
        let fz3 = fz * fz * fz;
        let xr = if fx3 > LAB_EPSILON { fx3 } else { (116.0 * fx - 16.0) / LAB_KAPPA };
        let yr = if self.l > LAB_KAPPA * LAB_EPSILON {
            fy * fy * fy
        } else {
            self.l / LAB_KAPPA
        };
        let zr = if fz3 > LAB_EPSILON { fz3 } else { (116.0 * fz - 16.0) / LAB_KAPPA };

        let (x, y, z) = (xr * WHITE_X, yr * WHITE_Y, zr * WHITE_Z);

        let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
        let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
        let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

        let to_u8 = |c: f64| (linear_to_srgb(c).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba::rgb(to_u8(r), to_u8(g), to_u8(b))
    }

    fn lerp(self, other: Lab, t: f64) -> Lab {
        Lab {
            l: self.l + (other.l - self.l) * t,
            a: self.a + (other.a - self.a) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }
}

// ── Lab scale ──

/// Piecewise-linear scale through a list of anchors, evaluated in Lab.
struct LabScale {
    stops: Vec<Lab>,
    correct_lightness: bool,
}

impl LabScale {
    fn new(hex: &[&str], correct_lightness: bool) -> Self {
        Self {
            stops: hex.iter().map(|h| Lab::from_rgba(parse_hex_color(h))).collect(),
            correct_lightness,
        }
    }

    fn raw(&self, t: f64) -> Lab {
        let n = self.stops.len();
        if n == 1 {
            return self.stops[0];
        }
        let pos = t.clamp(0.0, 1.0) * (n - 1) as f64;
        let i = (pos.floor() as usize).min(n - 2);
        self.stops[i].lerp(self.stops[i + 1], pos - i as f64)
    }

    /// Remap `t` so that L* grows linearly along the scale.
    fn corrected_t(&self, t: f64) -> f64 {
        let l0 = self.raw(0.0).l;
        let l1 = self.raw(1.0).l;
        let descending = l0 > l1;
        let ideal = l0 + (l1 - l0) * t;

        let mut t_out = t;
        let (mut lo, mut hi) = (0.0, 1.0);
        let mut diff = self.raw(t_out).l - ideal;
        let mut iterations = 20;
        while diff.abs() > 1e-2 && iterations > 0 {
            iterations -= 1;
            if descending {
                diff = -diff;
            }
            if diff < 0.0 {
                lo = t_out;
                t_out += (hi - t_out) * 0.5;
            } else {
                hi = t_out;
                t_out += (lo - t_out) * 0.5;
            }
            diff = self.raw(t_out).l - ideal;
        }
        t_out
    }

    fn sample(&self, t: f64) -> Rgba {
        let t = if self.correct_lightness { self.corrected_t(t) } else { t };
        self.raw(t).to_rgba()
    }

    fn colors(&self, count: usize) -> Vec<Rgba> {
        match count {
            0 => Vec::new(),
            1 => vec![self.sample(0.0)],
            _ => {
                let step = 1.0 / (count - 1) as f64;
                (0..count).map(|i| self.sample(i as f64 * step)).collect()
            }
        }
    }
}

/// `count` diverging colors, cool to warm.
pub fn diverging_palette(count: usize) -> Vec<Rgba> {
    diverging_palette_with(count, true)
}

pub fn diverging_palette_with(count: usize, correct_lightness: bool) -> Vec<Rgba> {
    match count {
        0 => return Vec::new(),
        1 => return vec![parse_hex_color(MIDPOINT)],
        _ => {}
    }

    let left: Vec<&str> = LEFT_ANCHORS.iter().copied().chain([MIDPOINT]).collect();
    let right: Vec<&str> = [MIDPOINT].into_iter().chain(RIGHT_ANCHORS.iter().copied()).collect();

    let even = count % 2 == 0;
    let per_side = count.div_ceil(2) + usize::from(even);

    let mut steps_left = LabScale::new(&left, correct_lightness).colors(per_side);
    let steps_right = LabScale::new(&right, correct_lightness).colors(per_side);

    if even {
        steps_left.pop();
    }
    steps_left.extend_from_slice(&steps_right[1..]);
    steps_left
}
