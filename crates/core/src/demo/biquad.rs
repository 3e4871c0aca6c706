use std::{
    f64::consts::{LN_2, PI},
    sync::Arc,
};

use realfft::{num_complex::Complex64, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{Result, Value, WasmPanelError};

/// Lowest response reported, so silent bins stay finite.
const FLOOR_DB: f64 = -300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
    Peak,
    HighShelf,
    LowShelf,
}

impl FilterType {
    pub const ALL: [FilterType; 7] = [
        Self::Lowpass,
        Self::Highpass,
        Self::Bandpass,
        Self::Notch,
        Self::Peak,
        Self::HighShelf,
        Self::LowShelf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
            Self::Bandpass => "bandpass",
            Self::Notch => "notch",
            Self::Peak => "peak",
            Self::HighShelf => "highShelf",
            Self::LowShelf => "lowShelf",
        }
    }

    /// Accepts either the numeric index or the name.
    pub fn from_value(value: &Value) -> Result<Self> {
        let found = match value {
            Value::Number(index) if index.fract() == 0.0 && *index >= 0.0 => Self::ALL.get(*index as usize).copied(),
            Value::Text(name) => Self::ALL.iter().copied().find(|kind| kind.name() == name),
            _ => None,
        };
        found.ok_or_else(|| WasmPanelError::msg(format!("unknown filter type {value}")))
    }

    /// Whether the gain parameter changes the response.
    pub fn uses_gain(self) -> bool {
        matches!(self, Self::Peak | Self::HighShelf | Self::LowShelf)
    }
}

/// Parameters shared by every design: centre frequency as a fraction of the
/// sample rate, bandwidth in octaves and gain in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub kind: FilterType,
    pub freq: f64,
    pub octaves: f64,
    pub db: f64,
}

/// Normalised second-order section (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    pub fn design(params: FilterParams) -> Result<Self> {
        let FilterParams {
            kind,
            freq,
            octaves,
            db,
        } = params;
        if !(freq > 0.0 && freq < 0.5) {
            return Err(WasmPanelError::msg(format!("frequency {freq} must lie in (0, 0.5)")));
        }
        if !(octaves > 0.0) {
            return Err(WasmPanelError::msg(format!("bandwidth {octaves} must be positive")));
        }

        let w0 = 2.0 * PI * freq;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin * (LN_2 / 2.0 * octaves * w0 / sin).sinh();
        let gain = 10f64.powf(db / 40.0);
        let shelf = 2.0 * gain.sqrt() * alpha;

        let (b, a) = match kind {
            FilterType::Lowpass => (
                [(1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0],
                [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
            ),
            FilterType::Highpass => (
                [(1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0],
                [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
            ),
            FilterType::Bandpass => ([alpha, 0.0, -alpha], [1.0 + alpha, -2.0 * cos, 1.0 - alpha]),
            FilterType::Notch => ([1.0, -2.0 * cos, 1.0], [1.0 + alpha, -2.0 * cos, 1.0 - alpha]),
            FilterType::Peak => (
                [1.0 + alpha * gain, -2.0 * cos, 1.0 - alpha * gain],
                [1.0 + alpha / gain, -2.0 * cos, 1.0 - alpha / gain],
            ),
            FilterType::LowShelf => (
                [
                    gain * ((gain + 1.0) - (gain - 1.0) * cos + shelf),
                    2.0 * gain * ((gain - 1.0) - (gain + 1.0) * cos),
                    gain * ((gain + 1.0) - (gain - 1.0) * cos - shelf),
                ],
                [
                    (gain + 1.0) + (gain - 1.0) * cos + shelf,
                    -2.0 * ((gain - 1.0) + (gain + 1.0) * cos),
                    (gain + 1.0) + (gain - 1.0) * cos - shelf,
                ],
            ),
            FilterType::HighShelf => (
                [
                    gain * ((gain + 1.0) + (gain - 1.0) * cos + shelf),
                    -2.0 * gain * ((gain - 1.0) + (gain + 1.0) * cos),
                    gain * ((gain + 1.0) + (gain - 1.0) * cos - shelf),
                ],
                [
                    (gain + 1.0) - (gain - 1.0) * cos + shelf,
                    2.0 * ((gain - 1.0) - (gain + 1.0) * cos),
                    (gain + 1.0) - (gain - 1.0) * cos - shelf,
                ],
            ),
        };

        let a0 = a[0];
        Ok(Self {
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            a: [a[1] / a0, a[2] / a0],
        })
    }

    /// Magnitude response in dB at `freq` (fraction of the sample rate).
    pub fn response_db(&self, freq: f64) -> f64 {
        let z1 = Complex64::from_polar(1.0, -2.0 * PI * freq);
        let z2 = z1 * z1;
        let numerator = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let denominator = 1.0 + z1 * self.a[0] + z2 * self.a[1];
        to_db((numerator / denominator).norm())
    }

    /// First `len` samples of the impulse response.
    pub fn impulse_response(&self, len: usize) -> Vec<f64> {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        (0..len)
            .map(|index| {
                let x0 = if index == 0 { 1.0 } else { 0.0 };
                let y0 = self.b[0] * x0 + self.b[1] * x1 + self.b[2] * x2 - self.a[0] * y1 - self.a[1] * y2;
                x2 = x1;
                x1 = x0;
                y2 = y1;
                y1 = y0;
                y0
            })
            .collect()
    }

    /// Response in dB at `points` evenly spaced frequencies from DC to
    /// Nyquist, measured from the spectrum of the impulse response.
    pub fn response_curve(&self, points: usize) -> Result<Vec<f64>> {
        if points < 2 {
            return Err(WasmPanelError::msg("a response curve needs at least two points"));
        }
        let len = 2 * (points - 1);
        let mut planner = RealFftPlanner::<f64>::new();
        let plan: Arc<dyn RealToComplex<f64>> = planner.plan_fft_forward(len);
        let mut input = self.impulse_response(len);
        let mut spectrum = plan.make_output_vec();
        plan.process(&mut input, &mut spectrum)
            .map_err(|err| WasmPanelError::msg(format!("fft failed: {err:?}")))?;

        Ok(spectrum.iter().map(|bin| to_db(bin.norm())).collect())
    }
}

fn to_db(magnitude: f64) -> f64 {
    (20.0 * magnitude.log10()).max(FLOOR_DB)
}
