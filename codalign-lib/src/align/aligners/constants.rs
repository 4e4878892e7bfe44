use anyhow::{anyhow, Error};
use std::{fmt::Display, str::FromStr};

/// Alignment scores are single-precision reals, like the scoring tables they are built from.
pub type Score = f32;

/// Value of a move that is not available.  An alignment that fails outright is reported as an
/// error instead of with this value.
pub const MIN_SCORE: Score = Score::NEG_INFINITY;

/// Reference and query lengths the scratch matrices are sized for up front.
pub const DEFAULT_ALIGNER_CAPACITY: usize = 200;

/// Alignment operations emitted by backtracking.  The frameshift variants only occur in codon
/// mode: they consume a single base that breaks the reading frame, and the base is written in
/// lower case in the aligned output.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash)]
pub enum EditOperation {
    Match,         // Consumes one reference and one query base
    Ins,           // Consumes a single query base, gap in the reference
    Del,           // Consumes a single reference base, gap in the query
    FrameshiftIns, // As Ins, lower-cases the query base
    FrameshiftDel, // As Del, lower-cases the reference base
}

impl EditOperation {
    pub fn is_frameshift(self) -> bool {
        matches!(
            self,
            EditOperation::FrameshiftIns | EditOperation::FrameshiftDel
        )
    }

    pub fn length_on_reference(self) -> usize {
        use EditOperation::{Del, FrameshiftDel, FrameshiftIns, Ins, Match};
        match self {
            Match | Del | FrameshiftDel => 1,
            Ins | FrameshiftIns => 0,
        }
    }

    pub fn length_on_query(self) -> usize {
        use EditOperation::{Del, FrameshiftDel, FrameshiftIns, Ins, Match};
        match self {
            Match | Ins | FrameshiftIns => 1,
            Del | FrameshiftDel => 0,
        }
    }
}

/// How the ends of the two sequences are treated.
///
/// The default alignment mode is Trim.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub enum AlignmentMode {
    /// Both sequences are aligned end to end; every gap is charged.
    Global,
    /// Gaps before the start and after the end of either sequence are free.
    #[default]
    Trim,
    /// The alignment may end at the best-scoring cell anywhere in the matrix.
    Local,
}

impl AlignmentMode {
    /// True when leading and trailing gaps are free.
    pub fn local(self) -> bool {
        self == AlignmentMode::Trim
    }

    /// True when the best cell of the whole matrix ends the alignment.
    pub fn true_local(self) -> bool {
        self == AlignmentMode::Local
    }
}

impl Display for AlignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Trim => write!(f, "trim"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl FromStr for AlignmentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(AlignmentMode::Global),
            "trim" => Ok(AlignmentMode::Trim),
            "local" | "true-local" | "true_local" => Ok(AlignmentMode::Local),
            _ => Err(anyhow!("Invalid alignment mode: {}", s)),
        }
    }
}

/// Memory model of the dynamic program.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub enum Space {
    /// Full score matrices, `O(reference x query)` memory.
    #[default]
    Quadratic,
    /// Divide and conquer over single rows, `O(query)` memory.
    Linear,
}

impl Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quadratic => write!(f, "quadratic"),
            Self::Linear => write!(f, "linear"),
        }
    }
}

impl FromStr for Space {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quadratic" => Ok(Space::Quadratic),
            "linear" => Ok(Space::Linear),
            _ => Err(anyhow!("Invalid space: {}", s)),
        }
    }
}

/// Layout of the aligned output.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub enum OutputFormat {
    /// Only the query, mapped onto reference coordinates: insertions relative to the reference
    /// are dropped.
    #[default]
    RefMap,
    /// Both aligned sequences, insertions included.
    Pairwise,
}

impl OutputFormat {
    /// True when query symbols that align to a gap in the reference are written out.
    pub fn report_ref_insertions(self) -> bool {
        self == OutputFormat::Pairwise
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RefMap => write!(f, "refmap"),
            Self::Pairwise => write!(f, "pairwise"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "refmap" => Ok(OutputFormat::RefMap),
            "pairwise" => Ok(OutputFormat::Pairwise),
            _ => Err(anyhow!("Invalid output format: {}", s)),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::{AlignmentMode, EditOperation, OutputFormat, Space};
    use rstest::rstest;

    #[rstest]
    #[case("global", AlignmentMode::Global)]
    #[case("TRIM", AlignmentMode::Trim)]
    #[case("Local", AlignmentMode::Local)]
    fn test_alignment_mode_round_trip(#[case] name: &str, #[case] mode: AlignmentMode) {
        assert_eq!(name.parse::<AlignmentMode>().unwrap(), mode);
        assert_eq!(mode.to_string(), name.to_ascii_lowercase());
    }

    #[rstest]
    fn test_alignment_mode_flags() {
        assert!(AlignmentMode::Trim.local());
        assert!(!AlignmentMode::Trim.true_local());
        assert!(!AlignmentMode::Local.local());
        assert!(AlignmentMode::Local.true_local());
        assert!(!AlignmentMode::Global.local());
        assert!(!AlignmentMode::Global.true_local());
        assert!("semi".parse::<AlignmentMode>().is_err());
    }

    #[rstest]
    fn test_space_parse() {
        assert_eq!("linear".parse::<Space>().unwrap(), Space::Linear);
        assert_eq!(Space::default(), Space::Quadratic);
        assert!("cubic".parse::<Space>().is_err());
    }

    #[rstest]
    fn test_output_format() {
        assert_eq!(OutputFormat::default(), OutputFormat::RefMap);
        assert!(!OutputFormat::RefMap.report_ref_insertions());
        assert!("PAIRWISE".parse::<OutputFormat>().unwrap().report_ref_insertions());
        assert_eq!(OutputFormat::Pairwise.to_string(), "pairwise");
    }

    #[rstest]
    #[case(EditOperation::Match, 1, 1, false)]
    #[case(EditOperation::Ins, 0, 1, false)]
    #[case(EditOperation::Del, 1, 0, false)]
    #[case(EditOperation::FrameshiftIns, 0, 1, true)]
    #[case(EditOperation::FrameshiftDel, 1, 0, true)]
    fn test_edit_operation_lengths(
        #[case] op: EditOperation,
        #[case] on_reference: usize,
        #[case] on_query: usize,
        #[case] frameshift: bool,
    ) {
        assert_eq!(op.length_on_reference(), on_reference);
        assert_eq!(op.length_on_query(), on_query);
        assert_eq!(op.is_frameshift(), frameshift);
    }
}
