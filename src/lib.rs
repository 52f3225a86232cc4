pub mod acquisition;
pub mod config;
pub mod error;
pub mod filters;
pub mod local;
pub mod utils;
pub mod visualization;

pub use error::{FilterError, Result};
pub use filters::{
    BiquadStage, CascadeFilter, DirectFormFilter, FilterChain, FilterFactory, FilterKind,
    FilterSpec, LiveFilter, Representation, StreamFilter, NO_DATA,
};
