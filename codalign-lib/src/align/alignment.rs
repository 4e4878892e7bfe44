use std::fmt;

use super::aligners::constants::{
    EditOperation::{self, Del, FrameshiftDel, FrameshiftIns, Ins, Match},
    Score,
};

/// A pairwise alignment of a reference and a query.  `reference` and `query` are the aligned
/// sequences, gaps and lower-cased frameshift bases included; they always have the same length.
/// When insertions relative to the reference are not reported, both aligned sequences skip those
/// columns, but `operations` still lists them.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Alignment {
    pub score: Score,

    /// Aligned reference sequence.
    pub reference: Vec<u8>,

    /// Aligned query sequence.
    pub query: Vec<u8>,

    /// Edit operations, first to last.
    pub operations: Vec<EditOperation>,

    /// Length of the reference sequence (not the aligned length).
    pub ref_len: usize,

    /// Length of the query sequence (not the aligned length).
    pub query_len: usize,
}

impl Alignment {
    /// Builds the aligned sequences by replaying `operations` over the two inputs.
    pub fn from_operations(
        score: Score,
        operations: Vec<EditOperation>,
        reference: &[u8],
        query: &[u8],
        gap: u8,
        report_ref_insertions: bool,
    ) -> Self {
        let mut aligned_ref = Vec::with_capacity(operations.len());
        let mut aligned_query = Vec::with_capacity(operations.len());
        let (mut r, mut q) = (0, 0);
        for op in &operations {
            match op {
                Match => {
                    aligned_ref.push(reference[r]);
                    aligned_query.push(query[q]);
                }
                Ins | FrameshiftIns => {
                    if report_ref_insertions {
                        aligned_ref.push(gap);
                        aligned_query.push(if *op == FrameshiftIns {
                            query[q].to_ascii_lowercase()
                        } else {
                            query[q]
                        });
                    }
                }
                Del => {
                    aligned_ref.push(reference[r]);
                    aligned_query.push(gap);
                }
                FrameshiftDel => {
                    aligned_ref.push(reference[r].to_ascii_lowercase());
                    aligned_query.push(gap);
                }
            }
            r += op.length_on_reference();
            q += op.length_on_query();
        }
        Alignment {
            score,
            reference: aligned_ref,
            query: aligned_query,
            operations,
            ref_len: reference.len(),
            query_len: query.len(),
        }
    }

    /// The number of aligned columns.
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// Validate that the operations consume both sequences exactly and that the aligned
    /// sequences line up.
    pub fn validate(&self) {
        let ref_len: usize = self
            .operations
            .iter()
            .map(|op| op.length_on_reference())
            .sum();
        let query_len: usize = self.operations.iter().map(|op| op.length_on_query()).sum();
        assert_eq!(ref_len, self.ref_len, "ref_len");
        assert_eq!(query_len, self.query_len, "query_len");
        assert_eq!(self.reference.len(), self.query.len(), "aligned lengths");
        assert!(self.len() <= self.operations.len());
    }

    /// Run-length encoded operations; frameshifts are written in lower case (`i`, `d`).
    pub fn cigar(&self) -> String {
        let mut cigar = String::new();
        let mut iter = self.operations.iter().peekable();
        while let Some(op) = iter.next() {
            let mut len = 1;
            while iter.peek() == Some(&op) {
                iter.next();
                len += 1;
            }
            let code = match op {
                Match => 'M',
                Ins => 'I',
                Del => 'D',
                FrameshiftIns => 'i',
                FrameshiftDel => 'd',
            };
            cigar.push_str(&format!("{len}{code}"));
        }
        cigar
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score: {} cigar: {} ref-len: {} query-len: {} aln-len: {}",
            self.score,
            self.cigar(),
            self.ref_len,
            self.query_len,
            self.len()
        )
    }
}
