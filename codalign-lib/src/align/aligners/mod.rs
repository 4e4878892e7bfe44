pub(crate) mod codon;
pub mod constants;
pub mod linear_space;
pub mod quadratic;

pub use constants::{AlignmentMode, OutputFormat, Space};

use derive_builder::Builder;
use log::debug;

use crate::align::{
    aligners::{
        constants::DEFAULT_ALIGNER_CAPACITY,
        linear_space::{align_linear, RowBuffers},
        quadratic::align_strings,
    },
    alignment::Alignment,
    error::AlignError,
    matrix::Workspace,
    scoring::Scoring,
};

#[derive(Copy, Clone, Debug, Builder)]
#[builder(name = "Builder", build_fn(name = "build_options"))]
pub struct Options {
    #[builder(default)]
    mode: AlignmentMode,
    #[builder(default = "true")]
    affine: bool,
    #[builder(default)]
    space: Space,
    #[builder(default)]
    format: OutputFormat,
}

impl Options {
    pub fn mode(&self) -> AlignmentMode {
        self.mode
    }

    pub fn affine(&self) -> bool {
        self.affine
    }

    pub fn space(&self) -> Space {
        self.space
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Fails for option combinations the engines cannot honor with this scoring model.
    fn validate(&self, scoring: &Scoring) -> Result<(), AlignError> {
        if self.space == Space::Linear {
            if scoring.is_codon() {
                return Err(AlignError::config(
                    "codon alignment is not supported in linear space",
                ));
            }
            if self.mode.true_local() {
                return Err(AlignError::config(
                    "local alignment is not supported in linear space",
                ));
            }
        }
        Ok(())
    }
}

impl Builder {
    /// Builds an aligner for `scoring`, validating the options against it first.
    pub fn build_aligner<'a>(&self, scoring: &'a Scoring) -> Result<Aligner<'a>, AlignError> {
        let opts = self
            .build_options()
            .map_err(|e| AlignError::config(e.to_string()))?;
        opts.validate(scoring)?;
        debug!(
            "Aligner: mode {} space {} affine {} format {} codon {}",
            opts.mode,
            opts.space,
            opts.affine,
            opts.format,
            scoring.is_codon()
        );
        let workspace = match opts.space {
            Space::Quadratic => {
                Workspace::with_capacity(DEFAULT_ALIGNER_CAPACITY, DEFAULT_ALIGNER_CAPACITY)
            }
            Space::Linear => Workspace::default(),
        };
        let rows = match opts.space {
            Space::Quadratic => RowBuffers::default(),
            Space::Linear => RowBuffers::with_capacity(DEFAULT_ALIGNER_CAPACITY),
        };
        Ok(Aligner {
            scoring,
            opts,
            workspace,
            rows,
        })
    }
}

/// Aligns queries against references with one scoring model, reusing its scratch space from
/// call to call.  Each worker thread owns its own aligner.
pub struct Aligner<'a> {
    scoring: &'a Scoring,
    opts: Options,
    // Score and gap matrices for quadratic space alignments
    workspace: Workspace,
    // Row buffers for linear space alignments
    rows: RowBuffers,
}

impl Aligner<'_> {
    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub fn scoring(&self) -> &Scoring {
        self.scoring
    }

    pub fn align(&mut self, reference: &[u8], query: &[u8]) -> Result<Alignment, AlignError> {
        match self.opts.space {
            Space::Quadratic => align_strings(
                reference,
                query,
                self.scoring,
                &self.opts,
                Some(&mut self.workspace),
            ),
            Space::Linear => align_linear(
                reference,
                query,
                self.scoring,
                &self.opts,
                Some(&mut self.rows),
            ),
        }
    }
}
