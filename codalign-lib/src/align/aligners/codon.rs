use super::constants::{EditOperation, Score, MIN_SCORE};
use crate::align::{
    matrix::DpMatrix,
    scoring::{codon_index, CodonScoring, GapCosts, CODON_STRIDE, NUM_CODONS},
};
use std::ops::Range;

/// The families of codon moves: a reference codon against 3 (or 0) query bases, the full gaps,
/// and the partial moves against 1, 2, 4 or 5 query bases.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveKind {
    Match,
    Deletion,
    Insertion,
    ThreeByOne,
    ThreeByTwo,
    ThreeByFour,
    ThreeByFive,
}

/// One codon move.  A move spans `width` alignment columns; bit `width - 1 - c` of a mask is set
/// when column `c` holds a base of that sequence.
#[derive(Copy, Clone, Debug)]
pub struct CodonMove {
    pub kind: MoveKind,
    pub width: usize,
    pub reference_mask: u8,
    pub query_mask: u8,
    /// Index of the move within its family, i.e. the column of the partial-codon table.
    pub sub_index: usize,
    /// For 3x4 and 3x5 moves, how far back from the current query position the three query bases
    /// paired with the reference codon are.
    pub offsets: [usize; 3],
    /// Miscalls charged when the move starts at the first query base, when it ends at the last
    /// query base, and otherwise.  A move touching both ends is charged the smaller of the two.
    pub start_miscalls: u8,
    pub end_miscalls: u8,
    pub interior_miscalls: u8,
}

impl CodonMove {
    const fn new(
        kind: MoveKind,
        width: usize,
        reference_mask: u8,
        query_mask: u8,
        sub_index: usize,
        offsets: [usize; 3],
        miscalls: [u8; 3],
    ) -> Self {
        Self {
            kind,
            width,
            reference_mask,
            query_mask,
            sub_index,
            offsets,
            start_miscalls: miscalls[0],
            end_miscalls: miscalls[1],
            interior_miscalls: miscalls[2],
        }
    }

    pub fn reference_len(&self) -> usize {
        self.reference_mask.count_ones() as usize
    }

    pub fn query_len(&self) -> usize {
        self.query_mask.count_ones() as usize
    }

    /// True when column `c` holds a reference base.
    #[inline]
    pub fn reference_at(&self, c: usize) -> bool {
        (self.reference_mask >> (self.width - 1 - c)) & 1 == 1
    }

    /// True when column `c` holds a query base.
    #[inline]
    pub fn query_at(&self, c: usize) -> bool {
        (self.query_mask >> (self.width - 1 - c)) & 1 == 1
    }

    /// Number of miscalls for the move ending at query position `q` of a matrix with `cols`
    /// columns.
    #[inline]
    fn miscalls(&self, q: usize, cols: usize) -> u8 {
        let mut miscalls = self.interior_miscalls;
        if q == self.query_len() {
            miscalls = miscalls.min(self.start_miscalls);
        }
        if q + 1 == cols {
            miscalls = miscalls.min(self.end_miscalls);
        }
        miscalls
    }

    /// Appends the per-base operations of this move in backtracking (last column first) order.
    pub fn push_operations(&self, ops: &mut Vec<EditOperation>) {
        match self.kind {
            MoveKind::Match => ops.extend([EditOperation::Match; 3]),
            MoveKind::Deletion => ops.extend([EditOperation::Del; 3]),
            MoveKind::Insertion => ops.extend([EditOperation::Ins; 3]),
            _ => {
                for c in (0..self.width).rev() {
                    let op = match (self.reference_at(c), self.query_at(c)) {
                        (true, true) => EditOperation::Match,
                        (true, false) => EditOperation::FrameshiftDel,
                        (false, _) => EditOperation::FrameshiftIns,
                    };
                    ops.push(op);
                }
            }
        }
    }
}

pub const NUM_MOVES: usize = 23;
pub const MATCH: usize = 0;
pub const DELETION: usize = 1;
pub const INSERTION: usize = 2;
const THREE_BY_ONE: Range<usize> = 3..6;
const THREE_BY_TWO: Range<usize> = 6..9;
const THREE_BY_FOUR: Range<usize> = 9..13;
const THREE_BY_FIVE: Range<usize> = 13..23;

const NO_OFFSETS: [usize; 3] = [0, 0, 0];

/// All codon moves, in tie-breaking order.
#[rustfmt::skip]
pub const MOVES: [CodonMove; NUM_MOVES] = {
    use MoveKind::{Deletion, Insertion, Match, ThreeByFive, ThreeByFour, ThreeByOne, ThreeByTwo};
    [
        CodonMove::new(Match,       3, 0b111,   0b111,   0, NO_OFFSETS, [0, 0, 0]),
        CodonMove::new(Deletion,    3, 0b111,   0b000,   0, NO_OFFSETS, [0, 0, 0]),
        CodonMove::new(Insertion,   3, 0b000,   0b111,   0, NO_OFFSETS, [0, 0, 0]),
        // 3x1: the single query base at codon position 0, 1 or 2
        CodonMove::new(ThreeByOne,  3, 0b111,   0b100,   0, NO_OFFSETS, [2, 0, 2]),
        CodonMove::new(ThreeByOne,  3, 0b111,   0b010,   1, NO_OFFSETS, [1, 1, 2]),
        CodonMove::new(ThreeByOne,  3, 0b111,   0b001,   2, NO_OFFSETS, [0, 2, 2]),
        // 3x2: the missing codon position is 2, 1 or 0
        CodonMove::new(ThreeByTwo,  3, 0b111,   0b110,   0, NO_OFFSETS, [1, 0, 1]),
        CodonMove::new(ThreeByTwo,  3, 0b111,   0b101,   1, NO_OFFSETS, [1, 1, 1]),
        CodonMove::new(ThreeByTwo,  3, 0b111,   0b011,   2, NO_OFFSETS, [0, 1, 1]),
        // 3x4: one extra query base
        CodonMove::new(ThreeByFour, 4, 0b1110,  0b1111,  0, [4, 3, 2], [1, 0, 1]),
        CodonMove::new(ThreeByFour, 4, 0b1101,  0b1111,  1, [4, 3, 1], [1, 1, 1]),
        CodonMove::new(ThreeByFour, 4, 0b1011,  0b1111,  2, [4, 2, 1], [1, 1, 1]),
        CodonMove::new(ThreeByFour, 4, 0b0111,  0b1111,  3, [3, 2, 1], [0, 1, 1]),
        // 3x5: two extra query bases
        CodonMove::new(ThreeByFive, 5, 0b11100, 0b11111, 0, [5, 4, 3], [2, 0, 2]),
        CodonMove::new(ThreeByFive, 5, 0b11010, 0b11111, 1, [5, 4, 2], [2, 1, 2]),
        CodonMove::new(ThreeByFive, 5, 0b11001, 0b11111, 2, [5, 4, 1], [2, 2, 2]),
        CodonMove::new(ThreeByFive, 5, 0b10110, 0b11111, 3, [5, 3, 2], [2, 1, 2]),
        CodonMove::new(ThreeByFive, 5, 0b10101, 0b11111, 4, [5, 3, 1], [2, 2, 2]),
        CodonMove::new(ThreeByFive, 5, 0b10011, 0b11111, 5, [5, 2, 1], [2, 2, 2]),
        CodonMove::new(ThreeByFive, 5, 0b01110, 0b11111, 6, [4, 3, 2], [1, 1, 2]),
        CodonMove::new(ThreeByFive, 5, 0b01101, 0b11111, 7, [4, 3, 1], [1, 2, 2]),
        CodonMove::new(ThreeByFive, 5, 0b01011, 0b11111, 8, [4, 2, 1], [1, 2, 2]),
        CodonMove::new(ThreeByFive, 5, 0b00111, 0b11111, 9, [3, 2, 1], [0, 2, 2]),
    ]
};

/// Evaluates the codon recurrence for single cells of a codon DP matrix.  Rows of the matrix are
/// reference codons, columns are query bases.
pub(crate) struct CodonStepper<'a> {
    pub reference: &'a [i16],
    pub query: &'a [i16],
    pub matrix: &'a [Score],
    pub tables: &'a CodonScoring,
    pub gaps: GapCosts,
    pub miscall: Score,
    pub cols: usize,
}

impl CodonStepper<'_> {
    /// Scores cell `(r, q)` from the cells above and to the left, writes the best score (and, with
    /// affine gap matrices, the gap scores) and returns the index into [`MOVES`] of the winning
    /// move.  Ties go to the lowest index.
    pub fn step(
        &self,
        r: usize,
        q: usize,
        score: &mut DpMatrix,
        affine: Option<(&mut DpMatrix, &mut DpMatrix)>,
    ) -> usize {
        let (mut insertion, mut deletion) = match affine {
            Some((insertion, deletion)) => (Some(insertion), Some(deletion)),
            None => (None, None),
        };
        let mut choices = [MIN_SCORE; NUM_MOVES];
        let curr = r * self.cols + q;

        if q >= 3 {
            let open = score.at(curr - 3) - self.gaps.open_insertion;
            choices[INSERTION] = match insertion.as_mut() {
                Some(insertion) => {
                    let extend = if q > 3 {
                        self.gaps.extend_insertion
                    } else {
                        self.gaps.open_insertion
                    };
                    let best = open.max(insertion.at(curr - 3) - extend);
                    insertion.put(curr, best);
                    best
                }
                None => open,
            };
        }

        if r >= 1 {
            let prev = curr - self.cols;
            let open = score.at(prev) - self.gaps.open_deletion;
            choices[DELETION] = match deletion.as_mut() {
                Some(deletion) => {
                    let extend = if r > 1 {
                        self.gaps.extend_deletion
                    } else {
                        self.gaps.open_deletion
                    };
                    let best = open.max(deletion.at(prev) - extend);
                    deletion.put(curr, best);
                    best
                }
                None => open,
            };

            let rpos = 3 * r;
            let r_codon = codon_index(
                self.reference[rpos - 3],
                self.reference[rpos - 2],
                self.reference[rpos - 1],
            )
            .unwrap_or(NUM_CODONS);

            if q >= 3 {
                let q_codon = self.query_codon(q, [3, 2, 1]).unwrap_or(NUM_CODONS);
                choices[MATCH] = score.at(prev - 3) + self.matrix[r_codon * CODON_STRIDE + q_codon];
            }

            if q >= 5 {
                for i in THREE_BY_FIVE {
                    let mv = &MOVES[i];
                    if let Some(partial) = self.query_codon(q, mv.offsets) {
                        choices[i] = score.at(prev - 5) - self.penalty(mv, q)
                            + self.tables.s3x5()[r_codon * 640 + 10 * partial + mv.sub_index];
                    }
                }
            }

            if q >= 4 {
                for i in THREE_BY_FOUR {
                    let mv = &MOVES[i];
                    if let Some(partial) = self.query_codon(q, mv.offsets) {
                        choices[i] = score.at(prev - 4) - self.penalty(mv, q)
                            + self.tables.s3x4()[r_codon * 256 + 4 * partial + mv.sub_index];
                    }
                }
            }

            if q >= 2 {
                let (first, second) = (self.query[q - 2], self.query[q - 1]);
                if first >= 0 && second >= 0 {
                    let partial = 4 * first as usize + second as usize;
                    for i in THREE_BY_TWO {
                        let mv = &MOVES[i];
                        choices[i] = score.at(prev - 2) - self.penalty(mv, q)
                            + self.tables.s3x2()[r_codon * 48 + 3 * partial + mv.sub_index];
                    }
                }
            }

            if q >= 1 && self.query[q - 1] >= 0 {
                let partial = self.query[q - 1] as usize;
                for i in THREE_BY_ONE {
                    let mv = &MOVES[i];
                    choices[i] = score.at(prev - 1) - self.penalty(mv, q)
                        + self.tables.s3x1()[r_codon * 12 + 3 * partial + mv.sub_index];
                }
            }
        }

        let mut best = MATCH;
        let mut max_score = MIN_SCORE;
        for (i, &choice) in choices.iter().enumerate() {
            if choice > max_score {
                max_score = choice;
                best = i;
            }
        }
        score.put(curr, max_score);
        best
    }

    /// The codon formed by the query bases `offsets` positions before `q`.
    #[inline]
    fn query_codon(&self, q: usize, offsets: [usize; 3]) -> Option<usize> {
        codon_index(
            self.query[q - offsets[0]],
            self.query[q - offsets[1]],
            self.query[q - offsets[2]],
        )
    }

    #[inline]
    fn penalty(&self, mv: &CodonMove, q: usize) -> Score {
        self.miscall * Score::from(mv.miscalls(q, self.cols))
    }
}

#[cfg(test)]
pub mod tests {
    use super::{CodonStepper, MoveKind, DELETION, INSERTION, MATCH, MOVES};
    use crate::align::{
        aligners::constants::EditOperation::{self, Del, FrameshiftDel, FrameshiftIns, Ins, Match},
        matrix::DpMatrix,
        scoring::{tests::codon_scoring, GapCosts},
    };
    use rstest::rstest;

    #[rstest]
    fn test_move_table_is_consistent() {
        for (index, mv) in MOVES.iter().enumerate() {
            let expected_query = match mv.kind {
                MoveKind::Match | MoveKind::Insertion => 3,
                MoveKind::Deletion => 0,
                MoveKind::ThreeByOne => 1,
                MoveKind::ThreeByTwo => 2,
                MoveKind::ThreeByFour => 4,
                MoveKind::ThreeByFive => 5,
            };
            assert_eq!(mv.query_len(), expected_query, "move {index}");
            let expected_reference = if mv.kind == MoveKind::Insertion { 0 } else { 3 };
            assert_eq!(mv.reference_len(), expected_reference, "move {index}");
            assert!(mv.width >= mv.query_len().max(mv.reference_len()));
            assert!(mv.start_miscalls <= mv.interior_miscalls, "move {index}");
            assert!(mv.end_miscalls <= mv.interior_miscalls, "move {index}");

            // offsets name the query bases in the reference columns
            if matches!(mv.kind, MoveKind::ThreeByFour | MoveKind::ThreeByFive) {
                let offsets: Vec<usize> = (0..mv.width)
                    .filter(|&c| mv.reference_at(c))
                    .map(|c| mv.width - c)
                    .collect();
                assert_eq!(offsets, mv.offsets.to_vec(), "move {index}");
            }
        }
    }

    #[rstest]
    fn test_ragged_edges_are_free_once_per_family() {
        for kind in [
            MoveKind::ThreeByOne,
            MoveKind::ThreeByTwo,
            MoveKind::ThreeByFour,
            MoveKind::ThreeByFive,
        ] {
            let family: Vec<_> = MOVES.iter().filter(|mv| mv.kind == kind).collect();
            assert_eq!(family.iter().filter(|mv| mv.start_miscalls == 0).count(), 1);
            assert_eq!(family.iter().filter(|mv| mv.end_miscalls == 0).count(), 1);
            // the free move at the start has its query bases flush against the next codon
            let start = family.iter().find(|mv| mv.start_miscalls == 0).unwrap();
            assert!(start.reference_at(start.width - 1) && start.query_at(start.width - 1));
            let end = family.iter().find(|mv| mv.end_miscalls == 0).unwrap();
            assert!(end.reference_at(0) && end.query_at(0));
        }
    }

    #[rstest]
    #[case(MATCH, vec![Match, Match, Match])]
    #[case(DELETION, vec![Del, Del, Del])]
    #[case(INSERTION, vec![Ins, Ins, Ins])]
    #[case(3, vec![FrameshiftDel, FrameshiftDel, Match])]
    #[case(7, vec![Match, FrameshiftDel, Match])]
    #[case(9, vec![FrameshiftIns, Match, Match, Match])]
    #[case(18, vec![Match, Match, FrameshiftIns, FrameshiftIns, Match])]
    fn test_push_operations(#[case] index: usize, #[case] expected: Vec<EditOperation>) {
        let mut ops = Vec::new();
        MOVES[index].push_operations(&mut ops);
        assert_eq!(ops, expected);
    }

    /// Reference ATG against query AT: dropping the final G is a ragged end, not a frameshift.
    #[rstest]
    fn test_step_prefers_free_ragged_end() {
        let scoring = codon_scoring(GapCosts::symmetric(10.0, 10.0), 10.0);
        let reference = scoring.char_map().encode(b"ATG");
        let query = scoring.char_map().encode(b"AT");
        let stepper = CodonStepper {
            reference: &reference,
            query: &query,
            matrix: scoring.matrix(),
            tables: scoring.codon().as_ref().unwrap(),
            gaps: *scoring.gaps(),
            miscall: scoring.miscall_cost(),
            cols: 3,
        };
        let mut score = DpMatrix::default();
        score.reset(2, 3);
        score.set(0, 1, -10.0);
        score.set(0, 2, -30.0);
        score.set(1, 0, -10.0);

        // "A" alone pairs best as the last base of the codon, free at the query start
        assert_eq!(stepper.step(1, 1, &mut score, None), 5);
        assert_eq!(score.get(1, 1), -2.5);
        // "AT" as the first two bases of ATG, free at the query end
        assert_eq!(stepper.step(1, 2, &mut score, None), 6);
        assert_eq!(score.get(1, 2), 5.0);
    }

    #[rstest]
    fn test_step_writes_gap_matrices() {
        let scoring = codon_scoring(GapCosts::new(4.0, 1.0, 6.0, 2.0), 10.0);
        let reference = scoring.char_map().encode(b"ATGAAA");
        let query = scoring.char_map().encode(b"ATG");
        let stepper = CodonStepper {
            reference: &reference,
            query: &query,
            matrix: scoring.matrix(),
            tables: scoring.codon().as_ref().unwrap(),
            gaps: *scoring.gaps(),
            miscall: scoring.miscall_cost(),
            cols: 4,
        };
        let (mut score, mut insertion, mut deletion) =
            (DpMatrix::default(), DpMatrix::default(), DpMatrix::default());
        for matrix in [&mut score, &mut insertion, &mut deletion] {
            matrix.reset(3, 4);
        }
        score.set(1, 3, 5.0);
        deletion.set(1, 3, -1.0);
        insertion.set(2, 0, -20.0);
        score.set(2, 0, -20.0);
        stepper.step(2, 3, &mut score, Some((&mut insertion, &mut deletion)));
        // opening a deletion (5 - 6) beats extending the open one (-1 - 2)
        assert_eq!(deletion.get(2, 3), -1.0);
        // the first insertion codon is charged the open cost either way
        assert_eq!(insertion.get(2, 3), -24.0);
    }
}
