//! Color correction lookup tables.
//!
//! The destination is always sRGB. [`ColorTables`] holds three 256-entry
//! tables translating between source-encoded samples, linear light, and
//! destination-encoded samples. Strategies never write a source color
//! without passing it through one of these tables; with correction disabled
//! the tables are identities, so the rule holds uniformly.

use crate::info::SourceEncoding;

/// Smallest file gamma accepted before clamping.
pub const MIN_GAMMA: f64 = 0.01;
/// Largest file gamma accepted before clamping.
pub const MAX_GAMMA: f64 = 10.0;

/// How source samples relate to linear light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CorrectionMode {
    /// No correction; all tables are identities.
    Disabled,
    /// Power-law source with the given file gamma (`linear = v^(1/gamma)`).
    Gamma(f64),
    /// sRGB-encoded source.
    Srgb,
}

impl CorrectionMode {
    /// Pick the mode for a source.
    ///
    /// An sRGB chunk wins over gAMA; unlabeled images are assumed sRGB.
    /// Gamma values are clamped to [`MIN_GAMMA`]..=[`MAX_GAMMA`]; a non-finite
    /// gamma is treated as unlabeled.
    pub fn select(enabled: bool, encoding: SourceEncoding) -> Self {
        if !enabled {
            return Self::Disabled;
        }
        match encoding {
            SourceEncoding::Srgb => Self::Srgb,
            SourceEncoding::Gamma(g) if g.is_finite() => Self::Gamma(g.clamp(MIN_GAMMA, MAX_GAMMA)),
            SourceEncoding::Gamma(_) | SourceEncoding::Unlabeled => Self::Srgb,
        }
    }

    /// Whether any correction is applied.
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// sRGB decode (IEC 61966-2-1), `v` in 0.0..=1.0.
pub fn srgb_to_linear(v: f64) -> f64 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB encode (IEC 61966-2-1), `v` in 0.0..=1.0.
pub fn linear_to_srgb(v: f64) -> f64 {
    if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Round a normalized value to the nearest 8-bit step.
#[inline]
pub(crate) fn quantize(v: f64) -> u8 {
    (0.5 + v.clamp(0.0, 1.0) * 255.0) as u8
}

/// The three lookup tables for one run.
///
/// Always fully populated, whatever the mode.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorTables {
    mode: CorrectionMode,
    src_to_linear: [f64; 256],
    src_to_dst: [u8; 256],
    linear_to_dst: [u8; 256],
}

impl ColorTables {
    /// Build tables for `mode`.
    pub fn new(mode: CorrectionMode) -> Self {
        let mut tables = Self {
            mode,
            src_to_linear: [0.0; 256],
            src_to_dst: [0; 256],
            linear_to_dst: [0; 256],
        };
        for n in 0..=255u8 {
            let i = n as usize;
            let v = n as f64 / 255.0;
            let linear = match mode {
                CorrectionMode::Disabled => {
                    tables.src_to_linear[i] = v;
                    tables.src_to_dst[i] = n;
                    tables.linear_to_dst[i] = n;
                    continue;
                }
                CorrectionMode::Srgb => srgb_to_linear(v),
                CorrectionMode::Gamma(g) => v.powf(1.0 / g.clamp(MIN_GAMMA, MAX_GAMMA)),
            };
            tables.src_to_linear[i] = linear;
            tables.src_to_dst[i] = quantize(linear_to_srgb(linear));
            tables.linear_to_dst[i] = quantize(linear_to_srgb(v));
        }
        tables
    }

    /// The mode these tables were built for.
    pub fn mode(&self) -> CorrectionMode {
        self.mode
    }

    /// Source sample → linear light.
    #[inline]
    pub fn src_to_linear(&self, sample: u8) -> f64 {
        self.src_to_linear[sample as usize]
    }

    /// Source sample → destination sample, for pixels that need no compositing.
    #[inline]
    pub fn src_to_dst(&self, sample: u8) -> u8 {
        self.src_to_dst[sample as usize]
    }

    /// Quantized linear value → destination sample.
    #[inline]
    pub fn linear_to_dst(&self, linear: u8) -> u8 {
        self.linear_to_dst[linear as usize]
    }

    /// Quantize a linear value to 8 bits and encode it for the destination.
    ///
    /// Rounding to the nearest linear step first is not the same as picking
    /// the destination value nearest in linear light; the difference shows up
    /// in dark tones and is accepted.
    #[inline]
    pub fn encode_linear(&self, linear: f64) -> u8 {
        self.linear_to_dst(quantize(linear))
    }

    /// Destination sample → linear light.
    pub fn dst_to_linear(&self, sample: u8) -> f64 {
        let v = sample as f64 / 255.0;
        if self.mode.is_enabled() {
            srgb_to_linear(v)
        } else {
            v
        }
    }

    /// Destination sample → source sample whose `src_to_dst` is nearest.
    ///
    /// Ties resolve to the lowest source value.
    pub fn dst_to_src(&self, sample: u8) -> u8 {
        let mut best = 0u8;
        let mut best_err = u8::MAX;
        for n in 0..=255u8 {
            let err = self.src_to_dst(n).abs_diff(sample);
            if err < best_err {
                best = n;
                best_err = err;
                if err == 0 {
                    break;
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tables_are_identity() {
        let t = ColorTables::new(CorrectionMode::Disabled);
        for n in 0..=255u8 {
            assert_eq!(t.src_to_dst(n), n);
            assert_eq!(t.linear_to_dst(n), n);
            assert_eq!(t.src_to_linear(n), n as f64 / 255.0);
            assert_eq!(t.dst_to_src(n), n);
        }
    }

    #[test]
    fn srgb_source_maps_to_itself() {
        let t = ColorTables::new(CorrectionMode::Srgb);
        for n in 0..=255u8 {
            assert_eq!(t.src_to_dst(n), n, "sample {n}");
        }
    }

    #[test]
    fn srgb_round_trip_through_linear_within_one_step() {
        // The quantized linear step q brackets the exact value, so the
        // re-encoded sample can only land between the neighbours of q.
        let t = ColorTables::new(CorrectionMode::Srgb);
        for n in 0..=255u8 {
            let q = quantize(t.src_to_linear(n));
            let lo = t.linear_to_dst(q.saturating_sub(1));
            let hi = t.linear_to_dst(q.saturating_add(1));
            let direct = t.src_to_dst(n);
            assert!(lo <= direct && direct <= hi, "sample {n}: {lo}..={hi} vs {direct}");
        }
    }

    #[test]
    fn srgb_round_trip_is_within_one_step_in_midtones_and_highlights() {
        // Below 49 one linear step spans several sRGB steps and the round
        // trip can drift further (sample 5 lands on linear step 0).
        let t = ColorTables::new(CorrectionMode::Srgb);
        assert_eq!(t.encode_linear(t.src_to_linear(5)), 0);
        for n in 49..=255u8 {
            let round_trip = t.encode_linear(t.src_to_linear(n));
            assert!(
                round_trip.abs_diff(t.src_to_dst(n)) <= 1,
                "sample {n}: {round_trip} vs {}",
                t.src_to_dst(n)
            );
        }
    }

    #[test]
    fn transfer_functions_invert() {
        for n in 0..=255 {
            let v = n as f64 / 255.0;
            assert!((linear_to_srgb(srgb_to_linear(v)) - v).abs() < 1e-9);
        }
    }

    #[test]
    fn gamma_one_is_linear_source() {
        let t = ColorTables::new(CorrectionMode::Gamma(1.0));
        assert_eq!(t.src_to_linear(51), 51.0 / 255.0);
        // Linear 0.2 encodes to sRGB ~0.4845.
        assert_eq!(t.src_to_dst(51), 124);
    }

    #[test]
    fn gamma_045_source_is_nearly_srgb() {
        let t = ColorTables::new(CorrectionMode::Gamma(0.45455));
        for n in 0..=255u8 {
            let d = t.src_to_dst(n) as i32 - n as i32;
            // A 2.2 power curve and the sRGB curve diverge most in the shadows.
            assert!(d.abs() <= 10, "sample {n} off by {d}");
        }
        assert_eq!(t.src_to_dst(0), 0);
        assert_eq!(t.src_to_dst(255), 255);
    }

    #[test]
    fn extreme_gamma_is_clamped() {
        let tiny = ColorTables::new(CorrectionMode::Gamma(1e-9));
        let clamped = ColorTables::new(CorrectionMode::Gamma(MIN_GAMMA));
        assert_eq!(tiny.src_to_dst, clamped.src_to_dst);

        let huge = ColorTables::new(CorrectionMode::Gamma(1e9));
        let clamped = ColorTables::new(CorrectionMode::Gamma(MAX_GAMMA));
        assert_eq!(huge.src_to_dst, clamped.src_to_dst);
    }

    #[test]
    fn mode_selection_policy() {
        assert_eq!(
            CorrectionMode::select(false, SourceEncoding::Srgb),
            CorrectionMode::Disabled
        );
        assert_eq!(
            CorrectionMode::select(true, SourceEncoding::Srgb),
            CorrectionMode::Srgb
        );
        assert_eq!(
            CorrectionMode::select(true, SourceEncoding::Gamma(0.5)),
            CorrectionMode::Gamma(0.5)
        );
        assert_eq!(
            CorrectionMode::select(true, SourceEncoding::Gamma(50.0)),
            CorrectionMode::Gamma(MAX_GAMMA)
        );
        assert_eq!(
            CorrectionMode::select(true, SourceEncoding::Gamma(0.0)),
            CorrectionMode::Gamma(MIN_GAMMA)
        );
        assert_eq!(
            CorrectionMode::select(true, SourceEncoding::Unlabeled),
            CorrectionMode::Srgb
        );
        assert_eq!(
            CorrectionMode::select(true, SourceEncoding::Gamma(f64::NAN)),
            CorrectionMode::Srgb
        );
    }

    #[test]
    fn linear_table_is_srgb_encode_when_enabled() {
        let t = ColorTables::new(CorrectionMode::Gamma(0.3));
        // Independent of the source curve.
        let s = ColorTables::new(CorrectionMode::Srgb);
        assert_eq!(t.linear_to_dst, s.linear_to_dst);
        assert_eq!(t.linear_to_dst(0), 0);
        assert_eq!(t.linear_to_dst(255), 255);
        // Linear 0.5 encodes to sRGB ~0.7354.
        assert_eq!(t.linear_to_dst(128), 188);
    }

    #[test]
    fn dst_to_src_inverts_src_to_dst() {
        let t = ColorTables::new(CorrectionMode::Gamma(1.0));
        for n in [0u8, 10, 77, 128, 200, 255] {
            let dst = t.src_to_dst(n);
            assert_eq!(t.src_to_dst(t.dst_to_src(dst)), dst);
        }
    }

    #[test]
    fn dst_to_linear_decodes_srgb_when_enabled() {
        let off = ColorTables::new(CorrectionMode::Disabled);
        assert_eq!(off.dst_to_linear(51), 0.2);
        let on = ColorTables::new(CorrectionMode::Srgb);
        assert!((on.dst_to_linear(255) - 1.0).abs() < 1e-12);
        assert!((on.dst_to_linear(128) - 0.2158605).abs() < 1e-6);
    }
}
