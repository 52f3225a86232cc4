use super::LiveFilter;
use crate::error::{FilterError, Result};

// HISTORY BUFFER --------------------------------------------------------------

// Fixed-capacity window of the most recent samples, newest first. The buffer
// is always full (zero-initialised), so pushing evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
struct SampleHistory {
    buffer: Box<[f64]>,
    head: usize,
}

impl SampleHistory {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity].into_boxed_slice(),
            head: 0,
        }
    }

    fn push(&mut self, sample: f64) {
        let capacity = self.buffer.len();
        if capacity == 0 {
            return;
        }
        self.head = (self.head + capacity - 1) % capacity;
        self.buffer[self.head] = sample;
    }

    #[allow(dead_code)]
    fn get(&self, index: usize) -> Option<f64> {
        let capacity = self.buffer.len();
        if index >= capacity {
            return None;
        }
        Some(self.buffer[(self.head + index) % capacity])
    }

    // Dot product of `coefficients[i]` with the i-th newest sample.
    fn dot(&self, coefficients: &[f64]) -> f64 {
        let (older, newer) = self.buffer.split_at(self.head);
        let (for_newer, for_older) = coefficients.split_at(newer.len());
        let head: f64 = for_newer.iter().zip(newer).map(|(c, x)| c * x).sum();
        let tail: f64 = for_older.iter().zip(older).map(|(c, x)| c * x).sum();
        head + tail
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.head = 0;
    }
}

// DIRECT FORM FILTER ----------------------------------------------------------

/// IIR filter evaluated straight from its transfer function, the `lfilter`
/// layout:
///
/// ```text
/// y[n] = (sum_i b[i] * x[n-i] - sum_{i>=1} a[i] * y[n-i]) / a[0]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DirectFormFilter {
    b: Vec<f64>,
    a: Vec<f64>,
    inputs: SampleHistory,
    outputs: SampleHistory,
}

impl DirectFormFilter {
    pub fn new(b: impl Into<Vec<f64>>, a: impl Into<Vec<f64>>) -> Result<Self> {
        let b = b.into();
        let a = a.into();

        if b.is_empty() {
            return Err(FilterError::EmptyCoefficients("b"));
        }
        if a.is_empty() {
            return Err(FilterError::EmptyCoefficients("a"));
        }
        if a[0] == 0.0 {
            return Err(FilterError::ZeroLeadingDenominator);
        }
        if !b.iter().chain(&a).all(|c| c.is_finite()) {
            return Err(FilterError::InvalidSpecification(
                "transfer function has a non-finite coefficient".to_string(),
            ));
        }

        let inputs = SampleHistory::new(b.len());
        let outputs = SampleHistory::new(a.len() - 1);

        Ok(DirectFormFilter {
            b,
            a,
            inputs,
            outputs,
        })
    }

    pub fn numerator(&self) -> &[f64] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64] {
        &self.a
    }
}

impl LiveFilter for DirectFormFilter {
    #[inline]
    fn process(&mut self, sample: f64) -> f64 {
        self.inputs.push(sample);
        let feedforward = self.inputs.dot(&self.b);
        let feedback = self.outputs.dot(&self.a[1..]);
        let output = (feedforward - feedback) / self.a[0];
        self.outputs.push(output);
        output
    }

    fn reset(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }
}
