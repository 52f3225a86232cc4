use crate::error::{FilterError, Result};

// One second-order section in transposed direct form II. Coefficients are
// stored normalised so that a[0] == 1.
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadStage {
    b: [f64; 3],
    a: [f64; 3],
    state: [f64; 2],
}

impl BiquadStage {
    /// Build a section from one `(b0, b1, b2, a0, a1, a2)` row.
    ///
    /// `row` is only used to report which section was malformed.
    pub fn from_row(row: usize, coefficients: &[f64]) -> Result<Self> {
        let [b0, b1, b2, a0, a1, a2]: [f64; 6] =
            coefficients
                .try_into()
                .map_err(|_| FilterError::InvalidSectionShape {
                    row,
                    len: coefficients.len(),
                })?;

        if a0 == 0.0 {
            return Err(FilterError::ZeroLeadingDenominator);
        }
        if !coefficients.iter().all(|c| c.is_finite()) {
            return Err(FilterError::InvalidSpecification(format!(
                "section {} has a non-finite coefficient",
                row
            )));
        }

        Ok(BiquadStage {
            b: [b0 / a0, b1 / a0, b2 / a0],
            a: [1.0, a1 / a0, a2 / a0],
            state: [0.0, 0.0],
        })
    }

    #[inline]
    pub fn update(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[1] * output + self.state[1];
        self.state[1] = self.b[2] * input - self.a[2] * output;
        output
    }

    pub fn reset(&mut self) {
        self.state = [0.0, 0.0];
    }

    pub(crate) fn state(&self) -> [f64; 2] {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_transposed_direct_form_two() {
        let mut stage = BiquadStage::from_row(0, &[1.0, 2.0, 3.0, 1.0, 0.5, 0.25]).unwrap();

        // y = x + s0; s0 = 2x - 0.5y + s1; s1 = 3x - 0.25y
        assert_eq!(stage.update(1.0), 1.0);
        assert_eq!(stage.state(), [1.5, 2.75]);
        assert_eq!(stage.update(0.0), 1.5);
        assert_eq!(stage.state(), [2.0, -0.375]);
    }

    #[test]
    fn normalises_leading_denominator() {
        let mut scaled = BiquadStage::from_row(0, &[2.0, 0.0, 0.0, 2.0, -1.0, 0.0]).unwrap();
        let mut unit = BiquadStage::from_row(0, &[1.0, 0.0, 0.0, 1.0, -0.5, 0.0]).unwrap();
        for x in [1.0, -3.0, 0.25, 7.0] {
            assert_eq!(scaled.update(x), unit.update(x));
        }
    }

    #[test]
    fn rejects_malformed_rows() {
        assert_eq!(
            BiquadStage::from_row(3, &[1.0, 0.0, 0.0, 1.0, 0.0]),
            Err(FilterError::InvalidSectionShape { row: 3, len: 5 })
        );
        assert_eq!(
            BiquadStage::from_row(0, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            Err(FilterError::ZeroLeadingDenominator)
        );
        assert!(BiquadStage::from_row(0, &[f64::NAN, 0.0, 0.0, 1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn reset_clears_delay_line() {
        let mut stage = BiquadStage::from_row(0, &[0.5, 0.5, 0.0, 1.0, -0.9, 0.0]).unwrap();
        let first = stage.update(1.0);
        stage.update(1.0);
        stage.reset();
        assert_eq!(stage.state(), [0.0, 0.0]);
        assert_eq!(stage.update(1.0), first);
    }
}
