use std::ops::Range;

use super::{
    constants::{EditOperation, Score, MIN_SCORE},
    quadratic::all_gaps,
    Options,
};
use crate::align::{
    alignment::Alignment,
    error::AlignError,
    scoring::{GapCosts, Scoring},
};

/// `ops[0]`: the start of the reference.
pub const START: i64 = -1;
/// A reference position the recursion did not pair with a query column.
pub const UNSET: i64 = -2;
/// A reference position in a run of deletions that precedes the next pending insertions.
pub const GAP_RUN: i64 = -3;

/// How the best score of a column was reached; only `DIAGONAL` (a match) is distinguished when
/// resolving single rows.  The two gap moves are recorded as 0 and 1.
const DIAGONAL: u8 = 2;

/// The last row of one cost-only pass.
#[derive(Debug, Clone, Default)]
pub struct Row {
    score: Vec<Score>,
    /// Best score ending in a gap in the reference.
    insertion: Vec<Score>,
    /// Best score ending in a gap in the query.
    deletion: Vec<Score>,
    how: Vec<u8>,
}

impl Row {
    fn reset(&mut self, cols: usize) {
        for v in [&mut self.score, &mut self.insertion, &mut self.deletion] {
            v.clear();
            v.resize(cols, 0.0);
        }
        self.how.clear();
        self.how.resize(cols, 0);
    }
}

/// Scratch rows for linear-space alignment: one for the forward pass over the upper half of a
/// range, one for the reverse pass over the lower half.  Sized by the query length only.
#[derive(Debug, Clone, Default)]
pub struct RowBuffers {
    forward: Row,
    reverse: Row,
}

impl RowBuffers {
    pub fn with_capacity(cols: usize) -> Self {
        let row = || Row {
            score: Vec::with_capacity(cols),
            insertion: Vec::with_capacity(cols),
            deletion: Vec::with_capacity(cols),
            how: Vec::with_capacity(cols),
        };
        RowBuffers {
            forward: row(),
            reverse: row(),
        }
    }

    fn reset(&mut self, cols: usize) {
        self.forward.reset(cols);
        self.reverse.reset(cols);
    }
}

/// Aligns `query` to `reference` in memory linear in the query length and reconstructs the
/// alignment from the resulting ops.
pub fn align_linear(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    options: &Options,
    buffers: Option<&mut RowBuffers>,
) -> Result<Alignment, AlignError> {
    check_supported(scoring, options)?;
    if reference.is_empty() || query.is_empty() {
        return Ok(all_gaps(reference, query, scoring, options));
    }
    let mut ops = vec![UNSET; reference.len() + 2];
    let score = linear_space_align(reference, query, scoring, options, &mut ops, buffers)?;
    Ok(Alignment::from_operations(
        score,
        operations_from_ops(&ops, reference.len()),
        reference,
        query,
        *scoring.gap_char(),
        options.format.report_ref_insertions(),
    ))
}

/// Runs the divide and conquer alignment, writing one marker per reference position into `ops`,
/// which must hold `reference.len() + 2` entries.  `ops[i + 1]` receives the query column matched
/// to reference position `i`, `UNSET` or `GAP_RUN`; `ops[0]` is `START` and the last entry is the
/// query length.
pub fn linear_space_align(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    options: &Options,
    ops: &mut [i64],
    buffers: Option<&mut RowBuffers>,
) -> Result<Score, AlignError> {
    check_supported(scoring, options)?;
    let (r_len, q_len) = (reference.len(), query.len());
    if ops.len() != r_len + 2 {
        return Err(AlignError::config(format!(
            "ops holds {} entries, expected {}",
            ops.len(),
            r_len + 2
        )));
    }
    ops.fill(UNSET);
    ops[0] = START;
    ops[r_len + 1] = q_len as i64;

    let mut owned = RowBuffers::default();
    let rows = match buffers {
        Some(buffers) => buffers,
        None => &mut owned,
    };
    rows.reset(q_len + 1);

    let engine = Engine {
        reference: scoring.char_map().encode(reference),
        query: scoring.char_map().encode(query),
        scoring,
        gaps: *scoring.gaps(),
        local: options.mode.local(),
        affine: options.affine,
    };
    Ok(engine.align_range(rows, ops, 0, r_len, 0, q_len, 0))
}

fn check_supported(scoring: &Scoring, options: &Options) -> Result<(), AlignError> {
    if scoring.is_codon() {
        Err(AlignError::config("codon alignment is not supported in linear space"))
    } else if options.mode.true_local() {
        Err(AlignError::config("local alignment is not supported in linear space"))
    } else {
        Ok(())
    }
}

struct Engine<'a> {
    reference: Vec<i16>,
    query: Vec<i16>,
    scoring: &'a Scoring,
    gaps: GapCosts,
    local: bool,
    affine: bool,
}

impl Engine<'_> {
    /// Scores `rows x cols` keeping only the last row, which is left in `row` and whose final
    /// cell is returned.  A reversed pass walks both ranges from their ends, so its row holds
    /// the scores of suffixes.
    ///
    /// `second_gap` describes a deletion that is already open on the starting edge: 1 when it
    /// continues from above the range, 2 when the pass must start with it.
    fn cost_only(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
        reversed: bool,
        second_gap: u8,
        row: &mut Row,
    ) -> Score {
        let GapCosts {
            open_insertion,
            extend_insertion,
            open_deletion,
            extend_deletion,
        } = self.gaps;
        let (s1_len, s2_len) = (rows.len(), cols.len());

        // free edge gaps, named in the direction of the pass
        let (ref_first, ref_last) = (rows.start == 0, rows.end == self.reference.len());
        let (query_first, query_last) = (cols.start == 0, cols.end == self.query.len());
        let (start1, end1, start2, end2) = if !self.local {
            (false, false, false, false)
        } else if reversed {
            (ref_last, ref_first, query_last, query_first)
        } else {
            (ref_first, ref_last, query_first, query_last)
        };

        let Row {
            score,
            insertion,
            deletion,
            how,
        } = row;

        if s1_len == 0 {
            if s2_len == 0 || start1 || end1 {
                score[..=s2_len].fill(0.0);
                if self.affine {
                    insertion[..=s2_len].fill(0.0);
                    deletion[..=s2_len].fill(0.0);
                }
                return 0.0;
            }
            score[0] = 0.0;
            for k in 1..=s2_len {
                let cost = if self.affine {
                    -open_insertion - (k - 1) as Score * extend_insertion
                } else {
                    -open_insertion * k as Score
                };
                score[k] = cost;
                if self.affine {
                    insertion[k] = cost;
                    deletion[k] = cost;
                }
            }
            return score[s2_len];
        } else if s2_len == 0 {
            return if start2 || end2 {
                0.0
            } else if self.affine {
                -open_deletion - (s1_len - 1) as Score * extend_deletion
            } else {
                -open_deletion * s1_len as Score
            };
        }

        let ref_code = |r: usize| {
            if reversed {
                self.reference[rows.end - r]
            } else {
                self.reference[rows.start + r - 1]
            }
        };
        let query_code = |c: usize| {
            if reversed {
                self.query[cols.end - c]
            } else {
                self.query[cols.start + c - 1]
            }
        };

        score[0] = 0.0;
        let mut diagonal: Score = 0.0;

        if self.affine {
            let lead = if second_gap == 1 {
                extend_deletion
            } else {
                open_deletion
            };
            insertion[0] = 0.0;
            deletion[0] = 0.0;
            if !start1 {
                let mut cost = -open_insertion;
                for k in 1..=s2_len {
                    score[k] = cost;
                    insertion[k] = cost;
                    deletion[k] = cost;
                    cost -= extend_insertion;
                }
            } else {
                for k in 1..=s2_len {
                    score[k] = 0.0;
                    insertion[k] = 0.0;
                    deletion[k] = -lead;
                }
                insertion[0] = -open_insertion;
            }
            if !start2 {
                insertion[0] = -lead;
                deletion[0] = -lead;
            }

            for r in 1..=s1_len {
                let c1 = ref_code(r);
                if start2 {
                    diagonal = 0.0;
                } else {
                    if r > 1 {
                        diagonal = -((r - 2) as Score * extend_deletion + lead);
                    }
                    score[0] = -(lead + (r - 1) as Score * extend_deletion);
                    insertion[0] = score[0];
                    deletion[0] = score[0];
                }

                for c in 1..=s2_len {
                    let ins = if end1 && r == s1_len {
                        score[c - 1].max(insertion[c - 1])
                    } else {
                        let extend = if c > 1 {
                            extend_insertion
                        } else {
                            open_insertion
                        };
                        (score[c - 1] - open_insertion).max(insertion[c - 1] - extend)
                    };
                    let del = if end2 && c == s2_len {
                        score[c].max(deletion[c])
                    } else {
                        let extend = if r > 1 {
                            extend_deletion
                        } else {
                            open_deletion
                        };
                        (score[c] - open_deletion).max(deletion[c] - extend)
                    };
                    let matched =
                        diagonal + self.scoring.pair_score(c1, query_code(c)).unwrap_or(0.0);
                    diagonal = score[c];

                    let (mut best, mut achieved) = (ins, 0);
                    if r > 1 || second_gap == 0 {
                        if del > best {
                            best = del;
                            achieved = 1;
                        }
                        if matched > best {
                            best = matched;
                            achieved = DIAGONAL;
                        }
                    }
                    score[c] = best;
                    how[c] = achieved;
                    deletion[c] = del;
                    insertion[c] = ins;
                }

                if start2 && r < s1_len {
                    insertion[0] -= extend_deletion;
                    deletion[0] -= extend_deletion;
                }
            }
        } else {
            for k in 1..=s2_len {
                score[k] = if start1 {
                    0.0
                } else {
                    -open_insertion * k as Score
                };
            }

            for r in 1..=s1_len {
                if start2 {
                    diagonal = 0.0;
                } else {
                    score[0] = -open_deletion * r as Score;
                    if r > 1 {
                        diagonal = -open_deletion * (r - 1) as Score;
                    }
                }
                let c1 = ref_code(r);

                for c in 1..=s2_len {
                    let mut del = score[c];
                    let mut ins = score[c - 1];
                    if c < s2_len || !end2 {
                        del -= open_deletion;
                    }
                    if r < s1_len || !end1 {
                        ins -= open_insertion;
                    }
                    let matched =
                        diagonal + self.scoring.pair_score(c1, query_code(c)).unwrap_or(0.0);
                    diagonal = score[c];

                    let (mut best, mut achieved) = (del, 0);
                    if ins > best {
                        best = ins;
                        achieved = 1;
                    }
                    if matched > best {
                        best = matched;
                        achieved = DIAGONAL;
                    }
                    score[c] = best;
                    how[c] = achieved;
                }
            }
        }
        score[s2_len]
    }

    /// Aligns reference `from1..to1` to query `from2..to2`, recursing on the split of the query
    /// that maximizes the combined score of the two halves.
    ///
    /// `gap_link` is a two bit code for deletions crossing the edges of the range: 2 when one
    /// enters from above, 1 when one leaves at the bottom.
    fn align_range(
        &self,
        rows: &mut RowBuffers,
        ops: &mut [i64],
        from1: usize,
        to1: usize,
        from2: usize,
        to2: usize,
        gap_link: u8,
    ) -> Score {
        if to2 == from2 || to1 == from1 {
            return 0.0;
        }
        let midpoint = (from1 + to1) / 2;
        let span = to2 - from2;
        let span1 = to1 - from1;
        let (r_len, q_len) = (self.reference.len(), self.query.len());

        let enters = (gap_link >= 2) as u8;
        if span1 > 1 {
            self.cost_only(from1..midpoint, from2..to2, false, enters, &mut rows.forward);
            self.cost_only(midpoint..to1, from2..to2, true, 2 * (gap_link % 2), &mut rows.reverse);
        } else {
            self.cost_only(from1..to1, from2..to2, false, enters, &mut rows.forward);
        }

        let GapCosts {
            open_insertion,
            extend_insertion,
            open_deletion,
            extend_deletion,
        } = self.gaps;
        let (forward, reverse) = (&rows.forward, &rows.reverse);
        let charge_tail = !self.local || to1 != r_len;

        let mut max_score = MIN_SCORE;
        let mut max_index = 0;
        let mut linked = false;
        let mut kind = 0;

        if !self.affine {
            if span1 > 1 {
                for k in 0..=span {
                    let current = forward.score[k] + reverse.score[span - k];
                    if current > max_score {
                        max_score = current;
                        max_index = k;
                    }
                }
            } else {
                for k in 0..=span {
                    let mut current = forward.score[k];
                    if charge_tail {
                        current -= open_insertion * (span - k) as Score;
                    }
                    if current > max_score {
                        max_score = current;
                        kind = forward.how[k];
                        max_index = k;
                    }
                }
            }
        } else if span1 > 1 {
            // a deletion crossing the midpoint is opened once, not in both halves
            let gap_offset = open_deletion - extend_deletion;
            for k in 0..=span {
                let no_gap = forward.score[k] + reverse.score[span - k];
                let mut with_gap = forward.deletion[k] + reverse.deletion[span - k] + gap_offset;
                // free end gaps leave nothing to merge on the outer edges
                let at_start = (from1 == 0 || from2 == 0) && k == 0;
                let at_end = (to1 == r_len || to2 == q_len) && k == span;
                if self.local && (at_start || at_end) {
                    with_gap -= gap_offset;
                }
                if no_gap > max_score {
                    max_score = no_gap;
                    max_index = k;
                    linked = false;
                }
                if with_gap > max_score {
                    max_score = with_gap;
                    max_index = k;
                    linked = true;
                }
            }
        } else if gap_link == 1 {
            max_index = span;
            max_score = forward.deletion[span];
            kind = 1;
        } else {
            for k in 0..=span {
                let mut no_gap = forward.score[k];
                let mut with_gap = forward.deletion[k];
                if charge_tail && span > k {
                    let tail = open_insertion + extend_insertion * (span - k - 1) as Score;
                    no_gap -= tail;
                    with_gap -= tail;
                }
                if no_gap > max_score {
                    max_score = no_gap;
                    max_index = k;
                    kind = forward.how[k];
                }
                if with_gap > max_score {
                    max_score = with_gap;
                    max_index = k;
                    kind = 0;
                }
            }
        }

        if span1 == 1 {
            if kind == DIAGONAL {
                ops[from1 + 1] = (from2 + max_index) as i64 - 1;
            } else if kind == 0 && max_index == 0 {
                ops[from1 + 1] = GAP_RUN;
            }
        } else {
            if max_index > 0 {
                let code = linked as u8 + if gap_link >= 2 { 2 } else { 0 };
                self.align_range(rows, ops, from1, midpoint, from2, from2 + max_index, code);
            } else if from2 == 0 {
                ops[from1 + 1..midpoint + 1].fill(GAP_RUN);
            }
            if max_index < span {
                let code = 2 * linked as u8 + gap_link % 2;
                self.align_range(rows, ops, midpoint, to1, from2 + max_index, to2, code);
            }
        }
        max_score
    }
}

/// Replays an ops array, last reference position first, into edit operations.
pub fn operations_from_ops(ops: &[i64], ref_len: usize) -> Vec<EditOperation> {
    let mut operations = Vec::with_capacity(ref_len + ops[ref_len + 1].max(0) as usize);
    let mut push = |op: EditOperation, count: i64| {
        operations.extend(std::iter::repeat(op).take(count.max(0) as usize));
    };
    let mut last = ops[ref_len + 1];
    let mut position = ref_len as i64 - 1;

    while position >= 0 {
        let mut current = ops[position as usize + 1];
        if current == UNSET {
            current = last;
        } else if current == GAP_RUN {
            // back to the previous matched column, or the start
            let mut p = position;
            while ops[(p + 1) as usize] < START {
                p -= 1;
            }
            let column = ops[(p + 1) as usize];
            push(EditOperation::Ins, last - 1 - column);
            last = column + 1;
            push(EditOperation::Del, position - p);
            position = p;
            continue;
        } else if current < 0 {
            push(EditOperation::Ins, last);
            push(EditOperation::Del, position + 1);
            last = 0;
            break;
        }

        if current == last {
            push(EditOperation::Del, 1);
        } else {
            push(EditOperation::Ins, last - 1 - current);
            push(EditOperation::Match, 1);
            last = current;
        }
        position -= 1;
    }
    push(EditOperation::Ins, last);

    operations.reverse();
    operations
}

#[cfg(test)]
pub mod tests {
    use super::{
        align_linear, linear_space_align, operations_from_ops, RowBuffers, GAP_RUN, START, UNSET,
    };
    use crate::align::{
        aligners::{
            constants::{
                AlignmentMode,
                EditOperation::{Del, Ins, Match},
                OutputFormat,
            },
            quadratic::{
                align_strings,
                tests::{nucleotide, options},
            },
        },
        alignment::{tests::s, Alignment},
        error::AlignError,
        scoring::{tests::codon_scoring, GapCosts, Scoring},
    };
    use rstest::rstest;

    fn strings(alignment: &Alignment) -> (String, String) {
        (
            String::from_utf8_lossy(&alignment.reference).to_string(),
            String::from_utf8_lossy(&alignment.query).to_string(),
        )
    }

    #[rstest]
    fn test_single_deletion_ops() {
        let scoring = Scoring::nucleotide();
        let options = options(AlignmentMode::Global, false, OutputFormat::Pairwise);
        let mut ops = vec![0; 6];
        let score =
            linear_space_align(b"ACGT", b"ACT", &scoring, &options, &mut ops, None).unwrap();
        assert_eq!(score, 5.0);
        assert_eq!(ops, vec![START, 0, 1, UNSET, 2, 3]);

        let alignment = align_linear(b"ACGT", b"ACT", &scoring, &options, None).unwrap();
        assert_eq!(alignment.score, 5.0);
        assert_eq!(strings(&alignment), ("ACGT".to_string(), "AC-T".to_string()));
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_identical(#[case] affine: bool) {
        let scoring = Scoring::nucleotide();
        let options = options(AlignmentMode::Global, affine, OutputFormat::Pairwise);
        let mut ops = vec![0; 6];
        let score =
            linear_space_align(b"ACGT", b"ACGT", &scoring, &options, &mut ops, None).unwrap();
        assert_eq!(score, 20.0);
        assert_eq!(ops, vec![START, 0, 1, 2, 3, 4]);
    }

    #[rstest]
    #[case(vec![START, 0, 1, UNSET, 2, 3], 4, vec![Match, Match, Del, Match])]
    #[case(vec![START, 0, 2, 3], 2, vec![Match, Ins, Match])]
    #[case(vec![START, UNSET, UNSET, 2], 2, vec![Ins, Ins, Del, Del])]
    #[case(vec![START, GAP_RUN, GAP_RUN, 1, 3], 3, vec![Del, Del, Ins, Match, Ins])]
    #[case(vec![START, 0, GAP_RUN, 3, 4], 3, vec![Match, Del, Ins, Ins, Match])]
    fn test_operations_from_ops(
        #[case] ops: Vec<i64>,
        #[case] ref_len: usize,
        #[case] expected: Vec<crate::align::aligners::constants::EditOperation>,
    ) {
        assert_eq!(ref_len + 2, ops.len());
        assert_eq!(operations_from_ops(&ops, ref_len), expected);
    }

    #[rstest]
    #[case(AlignmentMode::Global, "TTTTTTTT", "------CC")]
    #[case(AlignmentMode::Trim, "TTTTTTTT--", "--------CC")]
    fn test_gap_runs_precede_insertions(
        #[case] mode: AlignmentMode,
        #[case] reference: &str,
        #[case] query: &str,
    ) {
        let scoring = Scoring::nucleotide();
        let options = options(mode, false, OutputFormat::Pairwise);
        let alignment = align_linear(b"TTTTTTTT", b"CC", &scoring, &options, None).unwrap();
        assert_eq!(strings(&alignment), (reference.to_string(), query.to_string()));
    }

    #[rstest]
    fn test_refmap_terminates_on_gap_runs() {
        // the query runs past a reference deletion run; insertions are dropped from the strings
        let scoring = nucleotide(GapCosts::symmetric(10.0, 10.0));
        let pairwise = options(AlignmentMode::Global, false, OutputFormat::Pairwise);
        let refmap = options(AlignmentMode::Global, false, OutputFormat::RefMap);
        let full = align_linear(b"ACGTACGT", b"ACGGTACGT", &scoring, &pairwise, None).unwrap();
        let mapped = align_linear(b"ACGTACGT", b"ACGGTACGT", &scoring, &refmap, None).unwrap();
        assert_eq!(full.operations, mapped.operations);
        assert_eq!(mapped.reference, b"ACGTACGT".to_vec());
        assert_eq!(s(&full.query), b"ACGGTACGT".to_vec());
    }

    #[rstest]
    fn test_asymmetric_gaps_score_matches_alignment() {
        // cheap insertions, expensive deletions
        let scoring = nucleotide(GapCosts::new(2.0, 1.0, 9.0, 3.0));
        let options = options(AlignmentMode::Global, true, OutputFormat::Pairwise);
        let alignment = align_linear(b"TTTTTTTT", b"CC", &scoring, &options, None).unwrap();
        // two mismatches and one deletion of six
        assert_eq!(alignment.score, -32.0);
        assert_eq!(alignment.operations.iter().filter(|op| **op == Del).count(), 6);
        let alignment = align_linear(b"AACCGGTTAA", b"ACGT", &scoring, &options, None).unwrap();
        assert_eq!(alignment.score, -16.0);
    }

    #[rstest]
    #[case("ACGTACGT", "ACGAACGT")]
    #[case("ACGTTTACGT", "ACGTACGT")]
    #[case("GATTACA", "GCATGCT")]
    #[case("AACCGGTT", "ACGTNACG")]
    #[case("TTTTTTTT", "CC")]
    #[case("AACCGGTTAA", "ACGT")]
    #[case("ACGTACGTACGT", "ACGTAACGTACGT")]
    #[case("C", "ACGT")]
    fn test_matches_quadratic_scores(#[case] reference: &str, #[case] query: &str) {
        for gaps in [
            GapCosts::default(),
            GapCosts::new(2.0, 1.0, 9.0, 3.0),
            GapCosts::new(9.0, 3.0, 2.0, 1.0),
        ] {
            assert_matches_quadratic(reference, query, &nucleotide(gaps));
        }
    }

    fn assert_matches_quadratic(reference: &str, query: &str, scoring: &Scoring) {
        let mut buffers = RowBuffers::default();
        for mode in [AlignmentMode::Global, AlignmentMode::Trim] {
            for affine in [true, false] {
                let options = options(mode, affine, OutputFormat::Pairwise);
                let (r, q) = (reference.as_bytes(), query.as_bytes());
                let quadratic = align_strings(r, q, scoring, &options, None).unwrap();
                let linear = align_linear(r, q, scoring, &options, Some(&mut buffers)).unwrap();
                assert!(
                    (quadratic.score - linear.score).abs() < 1e-3,
                    "{mode} affine={affine} {:?}: {quadratic} vs {linear}",
                    scoring.gaps()
                );
                linear.validate();
                assert_eq!(s(&linear.reference), r, "{linear}");
                assert_eq!(s(&linear.query), q, "{linear}");
            }
        }
    }

    #[rstest]
    fn test_empty_sequences() {
        let scoring = Scoring::nucleotide();
        let options = options(AlignmentMode::Global, true, OutputFormat::Pairwise);
        let alignment = align_linear(b"ACGT", b"", &scoring, &options, None).unwrap();
        assert_eq!(alignment.score, -11.5);
        assert_eq!(strings(&alignment), ("ACGT".to_string(), "----".to_string()));

        let mut ops = vec![0; 2];
        assert_eq!(
            linear_space_align(b"", b"AC", &scoring, &options, &mut ops, None),
            Ok(0.0)
        );
        assert_eq!(ops, vec![START, 2]);
        assert_eq!(operations_from_ops(&ops, 0), vec![Ins, Ins]);
    }

    #[rstest]
    fn test_unsupported_combinations() {
        let options_local = options(AlignmentMode::Local, true, OutputFormat::Pairwise);
        let result = align_linear(b"ACGT", b"ACGT", &Scoring::nucleotide(), &options_local, None);
        assert!(matches!(result, Err(AlignError::Config(_))));

        let codon = codon_scoring(GapCosts::default(), 10.0);
        let options_global = options(AlignmentMode::Global, true, OutputFormat::Pairwise);
        let result = align_linear(b"ATGAAA", b"ATGAAA", &codon, &options_global, None);
        assert!(matches!(result, Err(AlignError::Config(_))));

        let mut short = vec![0; 3];
        let scoring = Scoring::nucleotide();
        let result =
            linear_space_align(b"ACGT", b"ACGT", &scoring, &options_global, &mut short, None);
        assert!(matches!(result, Err(AlignError::Config(_))));
    }
}
