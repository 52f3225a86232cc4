use super::{LiveFilter, StreamFilter};
use crate::error::{FilterError, Result};

// Filters applied one after another; stage i's output is stage i+1's input.
// Typical use is mains notch -> band-pass.
#[derive(Debug, Clone)]
pub struct FilterChain {
    stages: Vec<StreamFilter>,
}

impl FilterChain {
    pub fn new(stages: Vec<StreamFilter>) -> Result<Self> {
        if stages.is_empty() {
            return Err(FilterError::EmptyChain);
        }
        Ok(FilterChain { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[StreamFilter] {
        &self.stages
    }
}

impl LiveFilter for FilterChain {
    #[inline]
    fn process(&mut self, sample: f64) -> f64 {
        self.stages
            .iter_mut()
            .fold(sample, |input, stage| stage.update(input))
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}
