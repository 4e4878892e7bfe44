use super::{
    aligners::{
        codon::{CodonStepper, MoveKind, MOVES},
        constants::EditOperation,
    },
    error::AlignError,
    matrix::{DpMatrix, Workspace},
    scoring::{GapCosts, Scoring},
};

/// Walks filled score matrices from the cell an alignment ends in back towards the origin,
/// collecting edit operations last-first.  The cursor holds the number of reference and query
/// symbols not yet accounted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traceback {
    operations: Vec<EditOperation>,
    reference: usize,
    query: usize,
}

impl Traceback {
    /// Starts a traceback with `reference` and `query` symbols still to be consumed.
    pub fn new(reference: usize, query: usize) -> Self {
        Traceback {
            operations: Vec::with_capacity(reference + query),
            reference,
            query,
        }
    }

    fn cursor(&self) -> (usize, usize) {
        (self.reference, self.query)
    }

    /// Records an operation without moving the cursor, e.g. for unaligned suffixes.
    pub fn push(&mut self, op: EditOperation, count: usize) {
        self.operations
            .extend(std::iter::repeat(op).take(count));
    }

    fn consume(&mut self, op: EditOperation) {
        self.reference -= op.length_on_reference();
        self.query -= op.length_on_query();
        self.operations.push(op);
    }

    /// Backtracks a non-codon matrix filled with linear gap costs.  Ties prefer a match, then a
    /// deletion.
    pub fn linear_gaps(
        &mut self,
        score: &DpMatrix,
        reference: &[i16],
        query: &[i16],
        scoring: &Scoring,
    ) {
        let gaps = scoring.gaps();
        while self.reference > 0 && self.query > 0 {
            let (r, q) = (self.reference, self.query);
            let deletion = score.get(r - 1, q) - gaps.open_deletion;
            let insertion = score.get(r, q - 1) - gaps.open_insertion;
            let matched = score.get(r - 1, q - 1)
                + scoring
                    .pair_score(reference[r - 1], query[q - 1])
                    .unwrap_or(0.0);
            if matched >= deletion && matched >= insertion {
                self.consume(EditOperation::Match);
            } else if deletion >= insertion {
                self.consume(EditOperation::Del);
            } else {
                self.consume(EditOperation::Ins);
            }
        }
    }

    /// Backtracks a non-codon matrix filled with affine gap costs.  Once a gap is entered it is
    /// extended for as long as extending scores at least as well as opening.
    pub fn affine_gaps(
        &mut self,
        workspace: &Workspace,
        reference: &[i16],
        query: &[i16],
        scoring: &Scoring,
    ) {
        let GapCosts {
            open_insertion,
            extend_insertion,
            open_deletion,
            extend_deletion,
        } = *scoring.gaps();
        let (score, insertion, deletion) = (
            &workspace.score,
            &workspace.insertion,
            &workspace.deletion,
        );
        let cols = score.cols();
        while self.reference > 0 && self.query > 0 {
            let (r, q) = (self.reference, self.query);
            let mut curr = score.index(r, q);
            let scores = [
                deletion.at(curr),
                insertion.at(curr),
                score.at(curr - cols - 1)
                    + scoring
                        .pair_score(reference[r - 1], query[q - 1])
                        .unwrap_or(0.0),
            ];
            let mut best = 0;
            let mut max_score = scores[0];
            if scores[1] > max_score {
                max_score = scores[1];
                best = 1;
            }
            if scores[2] > max_score {
                best = 2;
            }
            match best {
                0 => {
                    self.consume(EditOperation::Del);
                    while self.reference > 0
                        && score.at(curr - cols) - open_deletion
                            <= deletion.at(curr - cols) - extend_deletion
                    {
                        self.consume(EditOperation::Del);
                        curr -= cols;
                    }
                }
                1 => {
                    self.consume(EditOperation::Ins);
                    while self.query > 0
                        && score.at(curr - 1) - open_insertion
                            <= insertion.at(curr - 1) - extend_insertion
                    {
                        self.consume(EditOperation::Ins);
                        curr -= 1;
                    }
                }
                _ => self.consume(EditOperation::Match),
            }
        }
    }

    /// Backtracks a codon matrix by re-evaluating the step at each cell and replaying the winning
    /// move.  Stops once either sequence is exhausted or fewer than three symbols remain in both.
    pub(crate) fn codons(
        &mut self,
        stepper: &CodonStepper<'_>,
        workspace: &mut Workspace,
        affine: bool,
    ) -> Result<(), AlignError> {
        let Workspace {
            score,
            insertion,
            deletion,
        } = workspace;
        let gaps = stepper.gaps;
        let cols = stepper.cols;
        while self.reference > 0 && self.query > 0 && (self.reference >= 3 || self.query >= 3) {
            let affine_matrices = if affine {
                Some((&mut *insertion, &mut *deletion))
            } else {
                None
            };
            let index = stepper.step(self.reference / 3, self.query, score, affine_matrices);
            let mv = &MOVES[index];

            let reference = self.reference as i64 - mv.reference_len() as i64;
            let query = self.query as i64 - mv.query_len() as i64;
            if reference < 0 || query < 0 {
                return Err(AlignError::Inconsistent { reference, query });
            }
            mv.push_operations(&mut self.operations);
            self.reference = reference as usize;
            self.query = query as usize;

            if affine {
                let mut k = (self.reference / 3) * cols + self.query;
                match mv.kind {
                    MoveKind::Deletion => {
                        while self.reference >= 3
                            && score.at(k) - gaps.open_deletion
                                <= deletion.at(k) - gaps.extend_deletion
                        {
                            self.reference -= 3;
                            self.push(EditOperation::Del, 3);
                            k -= cols;
                        }
                    }
                    MoveKind::Insertion => {
                        while self.query >= 3
                            && score.at(k) - gaps.open_insertion
                                <= insertion.at(k) - gaps.extend_insertion
                        {
                            self.query -= 3;
                            self.push(EditOperation::Ins, 3);
                            k -= 3;
                        }
                    }
                    _ => (),
                }
            }
        }
        Ok(())
    }

    /// Accounts for whatever the cursor has left (reference as deletions, then query as
    /// insertions) and returns the operations first-to-last.
    pub fn finish(mut self) -> Vec<EditOperation> {
        let (reference, query) = self.cursor();
        self.push(EditOperation::Del, reference);
        self.push(EditOperation::Ins, query);
        self.operations.reverse();
        self.operations
    }
}

#[cfg(test)]
pub mod tests {
    use super::Traceback;
    use crate::align::{
        aligners::constants::EditOperation::{Del, Ins, Match},
        matrix::DpMatrix,
        scoring::{GapCosts, Scoring},
    };
    use rstest::rstest;

    #[rstest]
    fn test_finish_flushes_cursor_and_reverses() {
        let mut traceback = Traceback::new(3, 2);
        // an unaligned query suffix, recorded before walking the matrix
        traceback.push(Ins, 1);
        traceback.consume(Match);
        assert_eq!(traceback.cursor(), (2, 1));
        assert_eq!(traceback.finish(), vec![Ins, Del, Del, Match, Ins]);
    }

    #[rstest]
    fn test_linear_gaps_prefers_match_on_ties() {
        let scoring = Scoring::new(
            b"AC",
            vec![1.0, -1.0, 0.0, -1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            GapCosts::symmetric(1.0, 1.0),
        )
        .unwrap();
        let reference = scoring.char_map().encode(b"A");
        let query = scoring.char_map().encode(b"C");
        // A vs C: the mismatch (0 - 1) ties with both gaps (0 - 1)
        let mut score = DpMatrix::default();
        score.reset(2, 2);
        score.set(1, 1, -1.0);
        let mut traceback = Traceback::new(1, 1);
        traceback.linear_gaps(&score, &reference, &query, &scoring);
        assert_eq!(traceback.finish(), vec![Match]);
    }
}
