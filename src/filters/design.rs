//! Coefficient sources.
//!
//! The filters never compute their own coefficients; they are handed them by
//! a [`CoefficientDesigner`]. [`SciRsDesigner`] is the default and follows
//! SciPy's `iirfilter(..., ftype="butter")`. Any other routine returning
//! `b/a` vectors or a section matrix can be plugged into the factory instead.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use sci_rs::signal::filter::design::{
    iirfilter_dyn, DigitalFilter, FilterBandType, FilterOutputType, FilterType,
};
use serde::{Deserialize, Serialize};

use super::{CascadeFilter, DirectFormFilter, StreamFilter};
use crate::error::{FilterError, Result};

// REPRESENTATION --------------------------------------------------------------

/// Which coefficient layout a design should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Representation {
    /// Numerator/denominator vectors, run by [`DirectFormFilter`].
    #[serde(rename = "ba", alias = "direct-form")]
    DirectForm,
    /// `n x 6` section matrix, run by [`CascadeFilter`].
    #[default]
    #[serde(rename = "sos", alias = "second-order-sections")]
    SecondOrderSections,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::DirectForm => write!(f, "ba"),
            Representation::SecondOrderSections => write!(f, "sos"),
        }
    }
}

impl FromStr for Representation {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ba" | "tf" | "direct-form" | "direct_form" => Ok(Representation::DirectForm),
            "sos" | "second-order-sections" | "second_order_sections" => {
                Ok(Representation::SecondOrderSections)
            }
            other => Err(FilterError::UnsupportedRepresentation(other.to_string())),
        }
    }
}

// DESIGN REQUEST --------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Lowpass,
    Highpass,
    Bandpass,
}

/// Everything a designer needs. Cutoffs are in Hz, not normalised.
#[derive(Debug, Clone, Copy)]
pub struct DesignRequest<'a> {
    pub order: usize,
    pub band: Band,
    pub cutoff: &'a [f64],
    pub sampling_rate: f64,
    pub representation: Representation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Coefficients {
    TransferFunction { b: Vec<f64>, a: Vec<f64> },
    Sections(Vec<[f64; 6]>),
}

impl Coefficients {
    /// Wrap the coefficients in the filter matching their layout.
    pub fn into_filter(self) -> Result<StreamFilter> {
        match self {
            Coefficients::TransferFunction { b, a } => Ok(DirectFormFilter::new(b, a)?.into()),
            Coefficients::Sections(sos) => Ok(CascadeFilter::new(&sos)?.into()),
        }
    }
}

// DESIGNER TRAIT --------------------------------------------------------------

pub trait CoefficientDesigner: Send + Sync {
    fn design(&self, request: &DesignRequest<'_>) -> Result<Coefficients>;

    /// Second-order notch at `frequency` Hz. The default is the closed-form
    /// design also used by SciPy's `iirnotch`.
    fn notch(&self, frequency: f64, quality: f64, sampling_rate: f64) -> Result<Coefficients> {
        notch_coefficients(frequency, quality, sampling_rate)
    }
}

/// Butterworth designs computed by `sci-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SciRsDesigner;

impl CoefficientDesigner for SciRsDesigner {
    fn design(&self, request: &DesignRequest<'_>) -> Result<Coefficients> {
        // sci-rs expects critical frequencies normalised to Nyquist
        let nyquist = request.sampling_rate / 2.0;
        let wn: Vec<f64> = request.cutoff.iter().map(|f| f / nyquist).collect();
        if wn.iter().any(|w| !(*w > 0.0 && *w < 1.0)) {
            return Err(FilterError::InvalidSpecification(format!(
                "cutoff {:?} Hz outside (0, {}) Hz",
                request.cutoff, nyquist
            )));
        }

        let band = match request.band {
            Band::Lowpass => FilterBandType::Lowpass,
            Band::Highpass => FilterBandType::Highpass,
            Band::Bandpass => FilterBandType::Bandpass,
        };
        let output = match request.representation {
            Representation::DirectForm => FilterOutputType::Ba,
            Representation::SecondOrderSections => FilterOutputType::Sos,
        };

        let designed = iirfilter_dyn(
            request.order,
            wn,
            None,                          // rp (not used for Butterworth)
            None,                          // rs (not used for Butterworth)
            Some(band),                    // btype
            Some(FilterType::Butterworth), // ftype
            Some(false),                   // digital
            Some(output),                  // ba or sos
            None,                          // fs (already normalised)
        );

        match designed {
            // sci-rs pads both vectors with zeros past the design order
            DigitalFilter::Ba(ba) => Ok(Coefficients::TransferFunction {
                b: trim_trailing_zeros(ba.b),
                a: trim_trailing_zeros(ba.a),
            }),
            DigitalFilter::Sos(sos) => Ok(Coefficients::Sections(
                sos.sos
                    .iter()
                    .map(|s| [s.b[0], s.b[1], s.b[2], s.a[0], s.a[1], s.a[2]])
                    .collect(),
            )),
            _ => Err(FilterError::Design(format!(
                "sci-rs returned an unexpected layout for {} output",
                request.representation
            ))),
        }
    }
}

// CLOSED-FORM DESIGNS ---------------------------------------------------------

/// Coefficients of a second-order IIR notch.
///
/// `quality` is `frequency / bandwidth` where the bandwidth is measured at
/// the -3 dB points.
pub fn notch_coefficients(frequency: f64, quality: f64, sampling_rate: f64) -> Result<Coefficients> {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(FilterError::InvalidSpecification(format!(
            "sampling rate must be positive, got {}",
            sampling_rate
        )));
    }
    let nyquist = sampling_rate / 2.0;
    if !(frequency > 0.0 && frequency < nyquist) {
        return Err(FilterError::InvalidSpecification(format!(
            "notch frequency {} Hz outside (0, {}) Hz",
            frequency, nyquist
        )));
    }
    if !(quality.is_finite() && quality > 0.0) {
        return Err(FilterError::InvalidSpecification(format!(
            "notch quality factor must be positive, got {}",
            quality
        )));
    }

    let w0 = PI * frequency / nyquist;
    let bandwidth = w0 / quality;
    let beta = (bandwidth / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);
    let cos_w0 = w0.cos();

    Ok(Coefficients::TransferFunction {
        b: vec![gain, -2.0 * gain * cos_w0, gain],
        a: vec![1.0, -2.0 * gain * cos_w0, 2.0 * gain - 1.0],
    })
}

fn trim_trailing_zeros(mut coefficients: Vec<f64>) -> Vec<f64> {
    while coefficients.len() > 1 && coefficients.last() == Some(&0.0) {
        coefficients.pop();
    }
    coefficients
}

/// Expand a section matrix into a single `b/a` pair by multiplying the
/// section polynomials together.
pub fn sections_to_transfer_function(sos: &[[f64; 6]]) -> (Vec<f64>, Vec<f64>) {
    let mut b = vec![1.0];
    let mut a = vec![1.0];
    for row in sos {
        b = polymul(&b, &row[..3]);
        a = polymul(&a, &row[3..]);
    }
    (b, a)
}

fn polymul(lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    let mut product = vec![0.0; lhs.len() + rhs.len() - 1];
    for (i, l) in lhs.iter().enumerate() {
        for (j, r) in rhs.iter().enumerate() {
            product[i + j] += l * r;
        }
    }
    product
}
