use super::biquad::BiquadStage;
use super::LiveFilter;
use crate::error::{FilterError, Result};

/// Cascade of second-order sections, the `sosfilt` layout.
///
/// Section 0 sees the raw input; each later section sees the output of the
/// one before it.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeFilter {
    sections: Vec<BiquadStage>,
}

impl CascadeFilter {
    /// Build from an `n x 6` matrix of `(b0, b1, b2, a0, a1, a2)` rows.
    pub fn new<R: AsRef<[f64]>>(sos: &[R]) -> Result<Self> {
        if sos.is_empty() {
            return Err(FilterError::EmptyCoefficients("sos"));
        }

        let sections = sos
            .iter()
            .enumerate()
            .map(|(row, coefficients)| BiquadStage::from_row(row, coefficients.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(CascadeFilter { sections })
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

impl LiveFilter for CascadeFilter {
    #[inline]
    fn process(&mut self, sample: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(sample, |input, section| section.update(input))
    }

    fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::NO_DATA;

    const SOS: [[f64; 6]; 2] = [
        [0.2, 0.4, 0.2, 1.0, -0.5, 0.1],
        [1.0, -2.0, 1.0, 1.0, -1.6, 0.7],
    ];

    #[test]
    fn threads_output_of_each_section_into_the_next() {
        let mut cascade = CascadeFilter::new(&SOS).unwrap();
        let mut first = BiquadStage::from_row(0, &SOS[0]).unwrap();
        let mut second = BiquadStage::from_row(1, &SOS[1]).unwrap();

        for x in [1.0, 0.0, -0.5, 2.0, 3.0, -1.0] {
            let expected = second.update(first.update(x));
            assert_eq!(cascade.update(x), expected);
        }
        assert_eq!(cascade.section_count(), 2);
    }

    #[test]
    fn accepts_vec_rows() {
        let rows: Vec<Vec<f64>> = SOS.iter().map(|row| row.to_vec()).collect();
        assert_eq!(CascadeFilter::new(&rows), CascadeFilter::new(&SOS));
    }

    #[test]
    fn rejects_empty_and_ragged_matrices() {
        let empty: [[f64; 6]; 0] = [];
        assert_eq!(
            CascadeFilter::new(&empty),
            Err(FilterError::EmptyCoefficients("sos"))
        );

        let ragged = vec![vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0], vec![1.0, 0.0, 1.0]];
        assert_eq!(
            CascadeFilter::new(&ragged),
            Err(FilterError::InvalidSectionShape { row: 1, len: 3 })
        );
    }

    #[test]
    fn missing_sample_leaves_sections_untouched() {
        let mut cascade = CascadeFilter::new(&SOS).unwrap();
        cascade.update(1.0);
        cascade.update(0.5);
        let before = cascade.clone();

        assert!(cascade.update(NO_DATA).is_nan());
        assert_eq!(cascade, before);
    }
}
