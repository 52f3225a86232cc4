// src/filters/mod.rs

//! Streaming IIR filters.
//!
//! Every filter consumes one sample and returns one sample. Two topologies are
//! provided because design routines emit either of them: [`CascadeFilter`]
//! runs second-order sections, [`DirectFormFilter`] runs the plain `b/a`
//! difference equation. [`FilterChain`] strings several filters together and
//! [`FilterFactory`] builds all of them from a [`FilterSpec`].
//!
//! Samples are `f64`. Overflow follows IEEE-754: a diverging filter saturates
//! to `±inf` and eventually yields `NaN`, which the next stage treats as
//! missing data. Nothing in the filter path checks for it.

pub mod biquad;
pub mod cascade;
pub mod chain;
pub mod design;
pub mod direct_form;
pub mod factory;

pub use biquad::BiquadStage;
pub use cascade::CascadeFilter;
pub use chain::FilterChain;
pub use design::{CoefficientDesigner, Coefficients, Representation, SciRsDesigner};
pub use direct_form::DirectFormFilter;
pub use factory::{FilterFactory, FilterKind, FilterSpec};

/// Marker for a sample the acquisition side could not deliver.
pub const NO_DATA: f64 = f64::NAN;

#[inline]
pub fn is_missing(sample: f64) -> bool {
    sample.is_nan()
}

// FILTER TRAIT ---------------------------------------------------------------

/// A stateful filter fed one sample at a time.
///
/// Implementors provide [`process`](LiveFilter::process); callers use
/// [`update`](LiveFilter::update), which returns a missing sample untouched
/// and leaves the filter state exactly as it was.
pub trait LiveFilter: Send {
    /// Advance the filter by one valid sample.
    fn process(&mut self, sample: f64) -> f64;

    /// Clear all history back to the freshly constructed state.
    fn reset(&mut self);

    #[inline]
    fn update(&mut self, sample: f64) -> f64 {
        if is_missing(sample) {
            return sample;
        }
        self.process(sample)
    }
}

// FILTER INSTANCE ------------------------------------------------------------

/// Any filter the factory can hand out.
#[derive(Debug, Clone)]
pub enum StreamFilter {
    DirectForm(DirectFormFilter),
    Cascade(CascadeFilter),
    Chain(FilterChain),
}

impl StreamFilter {
    pub fn topology(&self) -> &'static str {
        match self {
            StreamFilter::DirectForm(_) => "direct-form",
            StreamFilter::Cascade(_) => "second-order-sections",
            StreamFilter::Chain(_) => "chain",
        }
    }
}

impl LiveFilter for StreamFilter {
    #[inline]
    fn process(&mut self, sample: f64) -> f64 {
        match self {
            StreamFilter::DirectForm(filter) => filter.process(sample),
            StreamFilter::Cascade(filter) => filter.process(sample),
            StreamFilter::Chain(filter) => filter.process(sample),
        }
    }

    fn reset(&mut self) {
        match self {
            StreamFilter::DirectForm(filter) => filter.reset(),
            StreamFilter::Cascade(filter) => filter.reset(),
            StreamFilter::Chain(filter) => filter.reset(),
        }
    }
}

impl From<DirectFormFilter> for StreamFilter {
    fn from(filter: DirectFormFilter) -> Self {
        StreamFilter::DirectForm(filter)
    }
}

impl From<CascadeFilter> for StreamFilter {
    fn from(filter: CascadeFilter) -> Self {
        StreamFilter::Cascade(filter)
    }
}

impl From<FilterChain> for StreamFilter {
    fn from(filter: FilterChain) -> Self {
        StreamFilter::Chain(filter)
    }
}
