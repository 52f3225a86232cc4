use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use super::design::{Band, CoefficientDesigner, DesignRequest, Representation, SciRsDesigner};
use super::{FilterChain, StreamFilter};
use crate::error::{FilterError, Result};

pub const MAINS_FREQUENCY_HZ: f64 = 50.0;
pub const NOTCH_QUALITY: f64 = 30.0;
pub const MAX_ORDER: usize = 20;

// FILTER SPECIFICATION --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Highpass,
    Lowpass,
    /// Band-pass for EEG/EMG/ECG; takes `[low, high]` cutoffs.
    #[serde(alias = "bandpass")]
    Biopotential,
}

impl FilterKind {
    fn band(self) -> Band {
        match self {
            FilterKind::Highpass => Band::Highpass,
            FilterKind::Lowpass => Band::Lowpass,
            FilterKind::Biopotential => Band::Bandpass,
        }
    }

    fn cutoff_count(self) -> usize {
        match self {
            FilterKind::Highpass | FilterKind::Lowpass => 1,
            FilterKind::Biopotential => 2,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Highpass => write!(f, "highpass"),
            FilterKind::Lowpass => write!(f, "lowpass"),
            FilterKind::Biopotential => write!(f, "biopotential"),
        }
    }
}

impl FromStr for FilterKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highpass" | "high" => Ok(FilterKind::Highpass),
            "lowpass" | "low" => Ok(FilterKind::Lowpass),
            "biopotential" | "bandpass" => Ok(FilterKind::Biopotential),
            other => Err(FilterError::UnsupportedKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub order: usize,
    /// Hz. One value for high/low-pass, `[low, high]` for biopotential.
    pub cutoff: Vec<f64>,
    pub sampling_rate: f64,
    #[serde(default)]
    pub representation: Representation,
    #[serde(default)]
    pub include_notch: bool,
}

impl Default for FilterSpec {
    // OpenEarable ExG defaults: 256 Hz, 1-30 Hz band, mains notch on
    fn default() -> Self {
        Self {
            kind: FilterKind::Biopotential,
            order: 4,
            cutoff: vec![1.0, 30.0],
            sampling_rate: 256.0,
            representation: Representation::SecondOrderSections,
            include_notch: true,
        }
    }
}

impl FilterSpec {
    pub fn nyquist(&self) -> f64 {
        self.sampling_rate / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(FilterError::InvalidSpecification(msg));

        if self.order == 0 || self.order > MAX_ORDER {
            return invalid(format!(
                "order must be between 1 and {}, got {}",
                MAX_ORDER, self.order
            ));
        }
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return invalid(format!(
                "sampling rate must be positive, got {}",
                self.sampling_rate
            ));
        }
        if self.cutoff.len() != self.kind.cutoff_count() {
            return invalid(format!(
                "{} filter takes {} cutoff(s), got {}",
                self.kind,
                self.kind.cutoff_count(),
                self.cutoff.len()
            ));
        }

        let nyquist = self.nyquist();
        if let Some(bad) = self.cutoff.iter().find(|f| !(**f > 0.0 && **f < nyquist)) {
            return invalid(format!(
                "cutoff {} Hz must lie strictly between 0 and the Nyquist frequency {} Hz",
                bad, nyquist
            ));
        }
        if let [low, high] = self.cutoff.as_slice() {
            if low >= high {
                return invalid(format!(
                    "low cutoff {} Hz must be below high cutoff {} Hz",
                    low, high
                ));
            }
        }

        if self.include_notch {
            if self.kind != FilterKind::Biopotential {
                return invalid(format!("mains notch is not available for {} filters", self.kind));
            }
            if MAINS_FREQUENCY_HZ >= nyquist {
                return invalid(format!(
                    "mains notch at {} Hz needs a sampling rate above {} Hz",
                    MAINS_FREQUENCY_HZ,
                    2.0 * MAINS_FREQUENCY_HZ
                ));
            }
        }

        Ok(())
    }
}

// FACTORY ---------------------------------------------------------------------

pub struct FilterFactory {
    designer: Box<dyn CoefficientDesigner>,
}

impl Default for FilterFactory {
    fn default() -> Self {
        Self::new(SciRsDesigner)
    }
}

impl FilterFactory {
    pub fn new<D: CoefficientDesigner + 'static>(designer: D) -> Self {
        Self {
            designer: Box::new(designer),
        }
    }

    /// Validate `spec`, design its coefficients and assemble the filter.
    ///
    /// With `include_notch` the result is a two-stage chain (50 Hz notch in
    /// direct form, then the main filter); otherwise it is the main filter
    /// alone.
    pub fn build(&self, spec: &FilterSpec) -> Result<StreamFilter> {
        spec.validate()?;

        let request = DesignRequest {
            order: spec.order,
            band: spec.kind.band(),
            cutoff: &spec.cutoff,
            sampling_rate: spec.sampling_rate,
            representation: spec.representation,
        };
        let main = self.designer.design(&request)?.into_filter()?;
        debug!(
            "Designed {} filter: order {}, cutoff {:?} Hz, fs {} Hz, {}",
            spec.kind,
            spec.order,
            spec.cutoff,
            spec.sampling_rate,
            main.topology()
        );

        if !spec.include_notch {
            return Ok(main);
        }

        let notch = self
            .designer
            .notch(MAINS_FREQUENCY_HZ, NOTCH_QUALITY, spec.sampling_rate)?
            .into_filter()?;
        debug!(
            "Prepending {} Hz notch (Q = {})",
            MAINS_FREQUENCY_HZ, NOTCH_QUALITY
        );

        Ok(FilterChain::new(vec![notch, main])?.into())
    }

    pub fn highpass(
        &self,
        order: usize,
        cutoff: f64,
        sampling_rate: f64,
        representation: Representation,
    ) -> Result<StreamFilter> {
        self.build(&FilterSpec {
            kind: FilterKind::Highpass,
            order,
            cutoff: vec![cutoff],
            sampling_rate,
            representation,
            include_notch: false,
        })
    }

    pub fn biopotential(
        &self,
        order: usize,
        cutoff: [f64; 2],
        sampling_rate: f64,
        representation: Representation,
        include_notch: bool,
    ) -> Result<StreamFilter> {
        self.build(&FilterSpec {
            kind: FilterKind::Biopotential,
            order,
            cutoff: cutoff.to_vec(),
            sampling_rate,
            representation,
            include_notch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::design::Coefficients;
    use crate::filters::LiveFilter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Hands back a fixed moving average whatever is asked for
    struct FixedDesigner {
        calls: Arc<AtomicUsize>,
    }

    impl CoefficientDesigner for FixedDesigner {
        fn design(&self, _request: &DesignRequest<'_>) -> Result<Coefficients> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Coefficients::TransferFunction {
                b: vec![0.5, 0.5],
                a: vec![1.0],
            })
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [FilterKind::Highpass, FilterKind::Lowpass, FilterKind::Biopotential] {
            assert_eq!(kind.to_string().parse::<FilterKind>(), Ok(kind));
        }
        assert_eq!("bandpass".parse::<FilterKind>(), Ok(FilterKind::Biopotential));
        assert!(matches!(
            "bandstop".parse::<FilterKind>(),
            Err(FilterError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn validation_catches_bad_specifications() {
        let base = FilterSpec::default();
        assert!(base.validate().is_ok());

        let cases = [
            FilterSpec { order: 0, ..base.clone() },
            FilterSpec { order: MAX_ORDER + 1, ..base.clone() },
            FilterSpec { cutoff: vec![30.0, 1.0], ..base.clone() },
            FilterSpec { cutoff: vec![1.0, 128.0], ..base.clone() },
            FilterSpec { cutoff: vec![0.0, 30.0], ..base.clone() },
            FilterSpec { cutoff: vec![1.0], ..base.clone() },
            FilterSpec { sampling_rate: 0.0, ..base.clone() },
            FilterSpec { sampling_rate: 90.0, cutoff: vec![1.0, 30.0], ..base.clone() },
            FilterSpec {
                kind: FilterKind::Highpass,
                cutoff: vec![1.0],
                include_notch: true,
                ..base.clone()
            },
        ];
        for spec in cases {
            assert!(
                matches!(spec.validate(), Err(FilterError::InvalidSpecification(_))),
                "expected rejection of {:?}",
                spec
            );
        }
    }

    #[test]
    fn designer_is_swappable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = FilterFactory::new(FixedDesigner {
            calls: Arc::clone(&calls),
        });

        let mut filter = factory
            .highpass(2, 1.0, 256.0, Representation::DirectForm)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(filter.topology(), "direct-form");
        assert_eq!(filter.update(2.0), 1.0);
        assert_eq!(filter.update(2.0), 2.0);
    }

    #[test]
    fn notch_is_prepended_as_first_stage() {
        let factory = FilterFactory::default();
        let with_notch = factory
            .biopotential(4, [1.0, 30.0], 256.0, Representation::SecondOrderSections, true)
            .unwrap();
        let StreamFilter::Chain(chain) = &with_notch else {
            panic!("notch must produce a chain, got {}", with_notch.topology());
        };
        assert_eq!(chain.len(), 2);

        let without = factory
            .biopotential(4, [1.0, 30.0], 256.0, Representation::SecondOrderSections, false)
            .unwrap();
        let StreamFilter::Cascade(cascade) = &without else {
            panic!("expected a bare cascade, got {}", without.topology());
        };
        // band-pass of order 4 doubles to 8 poles -> 4 sections
        assert_eq!(cascade.section_count(), 4);
    }

    #[test]
    fn invalid_spec_never_reaches_the_designer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = FilterFactory::new(FixedDesigner {
            calls: Arc::clone(&calls),
        });

        assert!(factory
            .biopotential(0, [1.0, 30.0], 256.0, Representation::SecondOrderSections, false)
            .is_err());
        assert!(factory
            .biopotential(4, [30.0, 1.0], 256.0, Representation::SecondOrderSections, false)
            .is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
