use super::{
    codon::CodonStepper,
    constants::{EditOperation, Score},
    Options,
};
use crate::align::{
    alignment::Alignment,
    error::AlignError,
    matrix::{Scratch, Workspace},
    scoring::{GapCosts, Scoring},
    traceback::Traceback,
};

/// Aligns `query` to `reference` with full score matrices.
///
/// In codon mode (a codon scoring model) the rows of the matrices are reference codons and the
/// reference must be a whole number of codons.  Scratch matrices come from `workspace` when given,
/// and are allocated for the call otherwise; either way they are zeroed first, so results never
/// depend on earlier calls.
pub fn align_strings(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    options: &Options,
    workspace: Option<&mut Workspace>,
) -> Result<Alignment, AlignError> {
    let codon = scoring.is_codon();
    if codon && reference.len() % 3 != 0 {
        return Err(AlignError::FrameMismatch {
            len: reference.len(),
        });
    }
    if reference.is_empty() || query.is_empty() {
        return Ok(all_gaps(reference, query, scoring, options));
    }

    let (r_len, q_len) = (reference.len(), query.len());
    let stride = if codon { 3 } else { 1 };
    let rows = r_len / stride + 1;
    let cols = q_len + 1;
    let local = options.mode.local();
    let true_local = options.mode.true_local();
    let affine = options.affine;
    let gaps = *scoring.gaps();

    let r_codes = scoring.char_map().encode(reference);
    let q_codes = scoring.char_map().encode(query);
    let stepper = scoring.codon().as_ref().map(|tables| CodonStepper {
        reference: &r_codes,
        query: &q_codes,
        matrix: scoring.matrix(),
        tables,
        gaps,
        miscall: scoring.miscall_cost(),
        cols,
    });

    let mut scratch = Scratch::new(workspace);
    let workspace: &mut Workspace = &mut scratch;
    workspace.reset(rows, cols, affine);
    initialize(workspace, options, codon, &gaps, scoring.miscall_cost());

    match &stepper {
        Some(stepper) => fill_codons(workspace, stepper, affine),
        None => fill(workspace, &r_codes, &q_codes, scoring, affine),
    }

    // where the alignment ends
    let mut index_r = r_len;
    let mut index_q = q_len;
    let score_matrix = &workspace.score;
    let mut score = score_matrix.last();
    if true_local {
        for m in 1..rows {
            for k in 1..cols {
                if score_matrix.get(m, k) > score {
                    score = score_matrix.get(m, k);
                    index_r = stride * m;
                    index_q = k;
                }
            }
        }
    } else if local {
        for m in 0..rows - 1 {
            if score_matrix.get(m, cols - 1) > score {
                score = score_matrix.get(m, cols - 1);
                index_r = stride * m;
            }
        }
        for k in 0..cols - 1 {
            if score_matrix.get(rows - 1, k) > score {
                score = score_matrix.get(rows - 1, k);
                index_r = r_len;
                index_q = k;
            }
        }
    }

    let mut traceback = Traceback::new(index_r, index_q);
    traceback.push(EditOperation::Del, r_len - index_r);
    traceback.push(EditOperation::Ins, q_len - index_q);
    match &stepper {
        Some(stepper) => traceback.codons(stepper, workspace, affine)?,
        None if affine => traceback.affine_gaps(workspace, &r_codes, &q_codes, scoring),
        None => traceback.linear_gaps(&workspace.score, &r_codes, &q_codes, scoring),
    }

    Ok(Alignment::from_operations(
        score,
        traceback.finish(),
        reference,
        query,
        *scoring.gap_char(),
        options.format.report_ref_insertions(),
    ))
}

/// One sequence is empty: the other is copied through against gaps.
pub(super) fn all_gaps(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    options: &Options,
) -> Alignment {
    let gaps = scoring.gaps();
    let gap = *scoring.gap_char();
    let charge = |len: usize, open: Score, extend: Score| {
        if options.mode.local() || len == 0 {
            0.0
        } else if options.affine {
            -open - (len - 1) as Score * extend
        } else {
            -open * len as Score
        }
    };
    if reference.is_empty() {
        Alignment {
            score: charge(query.len(), gaps.open_insertion, gaps.extend_insertion),
            reference: vec![gap; query.len()],
            query: query.to_vec(),
            operations: vec![EditOperation::Ins; query.len()],
            ref_len: 0,
            query_len: query.len(),
        }
    } else {
        Alignment {
            score: charge(reference.len(), gaps.open_deletion, gaps.extend_deletion),
            reference: reference.to_vec(),
            query: vec![gap; reference.len()],
            operations: vec![EditOperation::Del; reference.len()],
            ref_len: reference.len(),
            query_len: 0,
        }
    }
}

/// Sets the first row and column of the matrices.  Global alignments charge leading gaps (in codon
/// mode, plus a miscall for leading gaps that break the frame); local alignments start every
/// path at zero, with the affine gap matrices primed to charge an open when a gap begins at the
/// edge.
fn initialize(
    workspace: &mut Workspace,
    options: &Options,
    codon: bool,
    gaps: &GapCosts,
    miscall: Score,
) {
    let Workspace {
        score,
        insertion,
        deletion,
    } = workspace;
    let (rows, cols) = (score.rows(), score.cols());
    let affine = options.affine;
    let frame = |shift: bool| if shift { miscall } else { 0.0 };

    if !options.mode.local() {
        if affine {
            let mut cost = -gaps.open_insertion;
            insertion.set(0, 0, cost);
            for i in 1..cols {
                score.set(0, i, cost);
                insertion.set(0, i, cost);
                deletion.set(0, i, cost);
                cost -= gaps.extend_insertion;
            }
            let mut cost = -gaps.open_deletion;
            deletion.set(0, 0, cost);
            for r in 1..rows {
                score.set(r, 0, cost);
                insertion.set(r, 0, cost);
                deletion.set(r, 0, cost);
                cost -= gaps.extend_deletion;
            }
        } else if !codon {
            for i in 1..cols {
                score.set(0, i, -gaps.open_insertion * i as Score);
            }
            for r in 1..rows {
                score.set(r, 0, -gaps.open_deletion * r as Score);
            }
        } else {
            for i in 1..cols {
                let cost = -gaps.open_insertion * i as Score;
                score.set(0, i, cost - frame(i % 3 != 1));
            }
            // the reference edge steps by the insertion open cost
            for r in 1..rows {
                let cost = -gaps.open_deletion - gaps.open_insertion * (r - 1) as Score;
                score.set(r, 0, cost - frame((r - 1) % 3 != 0));
            }
        }
    } else if affine {
        if codon {
            for i in 1..cols {
                deletion.set(0, i, -gaps.open_deletion - frame(i % 3 != 1));
            }
            for r in 1..rows {
                insertion.set(r, 0, -gaps.open_insertion - frame((r - 1) % 3 != 0));
            }
        } else {
            for i in 1..cols {
                deletion.set(0, i, -gaps.open_deletion);
            }
            for r in 1..rows {
                insertion.set(r, 0, -gaps.open_insertion);
            }
        }
    }
}

fn fill(
    workspace: &mut Workspace,
    reference: &[i16],
    query: &[i16],
    scoring: &Scoring,
    affine: bool,
) {
    let Workspace {
        score,
        insertion,
        deletion,
    } = workspace;
    let gaps = scoring.gaps();
    let cols = score.cols();
    for i in 1..score.rows() {
        let r_code = reference[i - 1];
        for j in 1..cols {
            let curr = score.index(i, j);
            let prev = curr - cols;

            let mut del = score.at(prev) - gaps.open_deletion;
            let mut ins = score.at(curr - 1) - gaps.open_insertion;
            let matched =
                score.at(prev - 1) + scoring.pair_score(r_code, query[j - 1]).unwrap_or(0.0);

            if affine {
                let extend_del = if i > 1 {
                    gaps.extend_deletion
                } else {
                    gaps.open_deletion
                };
                let extend_ins = if j > 1 {
                    gaps.extend_insertion
                } else {
                    gaps.open_insertion
                };
                del = del.max(deletion.at(prev) - extend_del);
                ins = ins.max(insertion.at(curr - 1) - extend_ins);
                deletion.put(curr, del);
                insertion.put(curr, ins);
            }

            score.put(curr, matched.max(del.max(ins)));
        }
    }
}

fn fill_codons(workspace: &mut Workspace, stepper: &CodonStepper<'_>, affine: bool) {
    let Workspace {
        score,
        insertion,
        deletion,
    } = workspace;
    for r in 1..score.rows() {
        for q in 1..score.cols() {
            let affine_matrices = if affine {
                Some((&mut *insertion, &mut *deletion))
            } else {
                None
            };
            stepper.step(r, q, score, affine_matrices);
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::align_strings;
    use crate::align::{
        aligners::{
            constants::{AlignmentMode, OutputFormat},
            Builder, Options,
        },
        alignment::{tests::s, Alignment},
        error::AlignError,
        matrix::Workspace,
        scoring::{tests::codon_scoring, GapCosts, Scoring, NUCLEOTIDE_ALPHABET},
    };
    use rstest::rstest;

    pub fn options(mode: AlignmentMode, affine: bool, format: OutputFormat) -> Options {
        Builder::default()
            .mode(mode)
            .affine(affine)
            .format(format)
            .build_options()
            .unwrap()
    }

    /// The built-in nucleotide scores with the given gap costs.
    pub fn nucleotide(gaps: GapCosts) -> Scoring {
        Scoring::new(
            NUCLEOTIDE_ALPHABET,
            Scoring::nucleotide().matrix().clone(),
            gaps,
        )
        .unwrap()
    }

    fn align(
        reference: &str,
        query: &str,
        scoring: &Scoring,
        mode: AlignmentMode,
        affine: bool,
    ) -> Alignment {
        let options = options(mode, affine, OutputFormat::Pairwise);
        align_strings(
            reference.as_bytes(),
            query.as_bytes(),
            scoring,
            &options,
            None,
        )
        .unwrap()
    }

    fn strings(alignment: &Alignment) -> (String, String) {
        (
            String::from_utf8_lossy(&alignment.reference).to_string(),
            String::from_utf8_lossy(&alignment.query).to_string(),
        )
    }

    #[rstest]
    fn test_identical_with_free_gaps() {
        let scoring = nucleotide(GapCosts::symmetric(0.0, 0.0));
        let alignment = align("ACGT", "ACGT", &scoring, AlignmentMode::Global, false);
        assert_eq!(alignment.score, 20.0);
        assert_eq!(strings(&alignment), ("ACGT".to_string(), "ACGT".to_string()));
    }

    #[rstest]
    #[case("ACGTTGCA")]
    #[case("GATTACA")]
    #[case("A")]
    fn test_self_alignment_scores_every_match(#[case] seq: &str) {
        let scoring = nucleotide(GapCosts::symmetric(0.0, 0.0));
        let alignment = align(seq, seq, &scoring, AlignmentMode::Global, false);
        assert_eq!(alignment.score, 5.0 * seq.len() as f32);
        assert_eq!(strings(&alignment), (seq.to_string(), seq.to_string()));
    }

    #[rstest]
    fn test_single_deletion_affine() {
        let scoring = Scoring::nucleotide();
        let alignment = align("ACGT", "ACT", &scoring, AlignmentMode::Global, true);
        assert_eq!(alignment.score, 5.0);
        assert_eq!(strings(&alignment), ("ACGT".to_string(), "AC-T".to_string()));
        assert_eq!(alignment.cigar(), "2M1D1M");
    }

    #[rstest]
    fn test_affine_gap_is_opened_once() {
        let scoring = Scoring::nucleotide();
        let alignment = align("ACGTTTACGT", "ACGTACGT", &scoring, AlignmentMode::Global, true);
        assert_eq!(alignment.score, 40.0 - 10.0 - 0.5);
        let (_, query) = strings(&alignment);
        assert_eq!(query.matches('-').count(), 2);
        assert!(query.contains("--"), "{query}");
    }

    #[rstest]
    #[case(AlignmentMode::Global, true, -11.5)]
    #[case(AlignmentMode::Global, false, -40.0)]
    #[case(AlignmentMode::Trim, true, 0.0)]
    #[case(AlignmentMode::Local, true, -11.5)]
    fn test_empty_query(#[case] mode: AlignmentMode, #[case] affine: bool, #[case] score: f32) {
        let scoring = Scoring::nucleotide();
        let alignment = align("ACGT", "", &scoring, mode, affine);
        assert_eq!(alignment.score, score);
        assert_eq!(strings(&alignment), ("ACGT".to_string(), "----".to_string()));
    }

    #[rstest]
    fn test_empty_reference_copies_query() {
        let scoring = nucleotide(GapCosts::symmetric(10.0, 1.0));
        let options = options(AlignmentMode::Global, false, OutputFormat::RefMap);
        let alignment = align_strings(b"", b"ACG", &scoring, &options, None).unwrap();
        assert_eq!(alignment.score, -30.0);
        assert_eq!(strings(&alignment), ("---".to_string(), "ACG".to_string()));

        let alignment = align("", "", &scoring, AlignmentMode::Global, true);
        assert_eq!(alignment.score, 0.0);
        assert!(alignment.is_empty());
    }

    #[rstest]
    fn test_trim_frees_end_gaps() {
        let scoring = nucleotide(GapCosts::symmetric(10.0, 10.0));
        let alignment = align("ACGTACGT", "GTAC", &scoring, AlignmentMode::Trim, false);
        assert_eq!(alignment.score, 20.0);
        assert_eq!(
            strings(&alignment),
            ("ACGTACGT".to_string(), "--GTAC--".to_string())
        );
    }

    #[rstest]
    fn test_refmap_drops_insertions() {
        let scoring = nucleotide(GapCosts::symmetric(10.0, 10.0));
        let alignment = align("ACGT", "ACGGT", &scoring, AlignmentMode::Global, false);
        assert_eq!(alignment.score, 10.0);
        assert_eq!(
            strings(&alignment),
            ("AC-GT".to_string(), "ACGGT".to_string())
        );

        let options = options(AlignmentMode::Global, false, OutputFormat::RefMap);
        let refmap = align_strings(b"ACGT", b"ACGGT", &scoring, &options, None).unwrap();
        assert_eq!(strings(&refmap), ("ACGT".to_string(), "ACGT".to_string()));
        assert_eq!(refmap.operations, alignment.operations);
    }

    #[rstest]
    #[case("ACGTACGT", "ACGAACGT")]
    #[case("ACGTACGT", "TTTT")]
    #[case("GATTACA", "GCATGCT")]
    #[case("AACCGGTT", "ACGTNACG")]
    #[case("A", "ACGTACGT")]
    fn test_local_never_scores_below_global(#[case] reference: &str, #[case] query: &str) {
        let scoring = Scoring::nucleotide();
        for affine in [true, false] {
            let global = align(reference, query, &scoring, AlignmentMode::Global, affine);
            let trim = align(reference, query, &scoring, AlignmentMode::Trim, affine);
            let local = align(reference, query, &scoring, AlignmentMode::Local, affine);
            assert!(trim.score >= global.score, "{trim} vs {global}");
            assert!(local.score >= global.score, "{local} vs {global}");
        }
    }

    #[rstest]
    #[case("ACGTACGT", "ACGAACGT")]
    #[case("ACGTTTACGT", "ACGTACGT")]
    #[case("GATTACA", "GCATGCT")]
    #[case("AACCGGTT", "ACGTNACG")]
    #[case("TTTTTTTT", "CC")]
    fn test_alignments_round_trip(#[case] reference: &str, #[case] query: &str) {
        let scoring = Scoring::nucleotide();
        for mode in [AlignmentMode::Global, AlignmentMode::Trim, AlignmentMode::Local] {
            for affine in [true, false] {
                let alignment = align(reference, query, &scoring, mode, affine);
                alignment.validate();
                assert_eq!(s(&alignment.reference), reference.as_bytes(), "{alignment}");
                assert_eq!(s(&alignment.query), query.as_bytes(), "{alignment}");
                assert!(alignment.len() >= reference.len().max(query.len()));
            }
        }
    }

    #[rstest]
    fn test_codon_ragged_end_is_free() {
        let scoring = codon_scoring(GapCosts::symmetric(10.0, 10.0), 10.0);
        let alignment = align("ATG", "AT", &scoring, AlignmentMode::Global, false);
        assert_eq!(alignment.score, 5.0);
        assert_eq!(strings(&alignment), ("ATg".to_string(), "AT-".to_string()));
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_codon_self_alignment(#[case] affine: bool) {
        let scoring = codon_scoring(GapCosts::default(), 10.0);
        let alignment = align("ATGAAA", "ATGAAA", &scoring, AlignmentMode::Global, affine);
        assert_eq!(alignment.score, 10.0);
        assert_eq!(strings(&alignment), ("ATGAAA".to_string(), "ATGAAA".to_string()));
    }

    #[rstest]
    #[case("ATGAAACCCGGG", "ATGAACCCGGG")]
    #[case("ATGAAACCCGGG", "ATGAAATCCCGGG")]
    #[case("ATGAAACCCGGG", "ATGCCCGGG")]
    #[case("ATGAAACCCGGG", "ATGAAANNNCCCGGG")]
    #[case("ATGAAA", "GGGGGGATGAAAGGGGGG")]
    fn test_codon_round_trip(#[case] reference: &str, #[case] query: &str) {
        let scoring = codon_scoring(GapCosts::default(), 10.0);
        for mode in [AlignmentMode::Global, AlignmentMode::Trim, AlignmentMode::Local] {
            for affine in [true, false] {
                let alignment = align(reference, query, &scoring, mode, affine);
                alignment.validate();
                assert_eq!(s(&alignment.reference), reference.as_bytes(), "{alignment}");
                assert_eq!(s(&alignment.query), query.as_bytes(), "{alignment}");
            }
        }
    }

    #[rstest]
    fn test_codon_frameshift_is_lower_cased() {
        let scoring = codon_scoring(GapCosts::default(), 2.0);
        let alignment = align(
            "ATGAAACCCGGG",
            "ATGAACCCGGG",
            &scoring,
            AlignmentMode::Global,
            true,
        );
        let (reference, query) = strings(&alignment);
        assert_eq!(query.matches('-').count(), 1, "{reference} / {query}");
        assert_eq!(reference.chars().filter(char::is_ascii_lowercase).count(), 1);
        assert!(alignment.operations.iter().any(|op| op.is_frameshift()));
    }

    #[rstest]
    fn test_codon_requires_whole_codons() {
        let scoring = codon_scoring(GapCosts::default(), 10.0);
        let options = options(AlignmentMode::Global, true, OutputFormat::Pairwise);
        let result = align_strings(b"ATGA", b"ATGA", &scoring, &options, None);
        assert_eq!(result, Err(AlignError::FrameMismatch { len: 4 }));
    }

    /// The global, linear-gap codon initialization steps down the reference edge by the insertion
    /// open cost rather than the deletion open cost.
    #[rstest]
    fn test_codon_reference_edge_steps_by_insertion_open() {
        let scoring = codon_scoring(GapCosts::new(2.0, 1.0, 7.0, 1.0), 1.0);
        let options = options(AlignmentMode::Global, false, OutputFormat::Pairwise);
        let mut workspace = Workspace::default();
        align_strings(b"ATGAAACCC", b"ATGAAA", &scoring, &options, Some(&mut workspace)).unwrap();
        let score = &workspace.score;
        assert_eq!(score.get(1, 0), -7.0);
        assert_eq!(score.get(2, 0), -7.0 - 2.0 - 1.0);
        assert_eq!(score.get(3, 0), -7.0 - 4.0 - 1.0);
        // the query edge charges a miscall off codon boundaries
        assert_eq!(score.get(0, 1), -2.0);
        assert_eq!(score.get(0, 2), -4.0 - 1.0);
        assert_eq!(score.get(0, 3), -6.0 - 1.0);
        assert_eq!(score.get(0, 4), -8.0);
    }

    #[rstest]
    fn test_reused_workspace_gives_same_result() {
        let scoring = Scoring::nucleotide();
        let options = options(AlignmentMode::Trim, true, OutputFormat::Pairwise);
        let fresh = align_strings(b"ACGTAC", b"AGTC", &scoring, &options, None).unwrap();
        let mut workspace = Workspace::default();
        align_strings(b"TTTTTTTTTTTT", b"GGGGGGGGG", &scoring, &options, Some(&mut workspace))
            .unwrap();
        let reused =
            align_strings(b"ACGTAC", b"AGTC", &scoring, &options, Some(&mut workspace)).unwrap();
        assert_eq!(fresh, reused);
        let again =
            align_strings(b"ACGTAC", b"AGTC", &scoring, &options, Some(&mut workspace)).unwrap();
        assert_eq!(reused, again);
    }
}
