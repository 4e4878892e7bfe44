pub mod aligners;
pub mod alignment;
pub mod error;
pub mod io;
pub mod matrix;
pub mod scoring;
pub mod traceback;

pub use aligners::{
    constants::{EditOperation, Score, MIN_SCORE},
    Aligner, AlignmentMode, Builder, Options, OutputFormat, Space,
};
pub use alignment::Alignment;
pub use error::AlignError;
pub use scoring::{DataType, GapCosts, Scoring};
