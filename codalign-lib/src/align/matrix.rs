use super::aligners::constants::Score;
use std::ops::{Deref, DerefMut};

/// A dense, row-major matrix of scores.  Cells are addressed either by `(row, column)` or by the
/// flat index `row * cols + column`; the dynamic programs step between neighbouring cells with
/// flat offsets (`-1` left, `-cols` up).
#[derive(Default, Clone, PartialEq, Debug)]
pub struct DpMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Score>,
}

impl DpMatrix {
    pub fn with_capacity(rows: usize, cols: usize) -> Self {
        DpMatrix {
            rows: 0,
            cols: 0,
            cells: Vec::with_capacity(rows * cols),
        }
    }

    /// Resizes to `rows x cols` with every cell set to zero, keeping the allocation.
    pub fn reset(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.cells.clear();
        self.cells.resize(rows * cols, 0.0);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The flat index of a cell.
    #[inline(always)]
    pub fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        i * self.cols + j
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> Score {
        self.cells[self.index(i, j)]
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, v: Score) {
        let index = self.index(i, j);
        self.cells[index] = v;
    }

    /// The cell at a flat index.
    #[inline(always)]
    pub fn at(&self, index: usize) -> Score {
        self.cells[index]
    }

    /// Sets the cell at a flat index.
    #[inline(always)]
    pub fn put(&mut self, index: usize, v: Score) {
        self.cells[index] = v;
    }

    /// The last cell (bottom right).
    pub fn last(&self) -> Score {
        self.cells.last().copied().unwrap_or(0.0)
    }
}

/// The score matrix plus the affine insertion and deletion matrices.  A workspace is reused
/// across alignments so the matrices are only grown, never reallocated per query.
#[derive(Default, Clone, Debug)]
pub struct Workspace {
    pub score: DpMatrix,
    pub insertion: DpMatrix,
    pub deletion: DpMatrix,
}

impl Workspace {
    pub fn with_capacity(rows: usize, cols: usize) -> Self {
        Workspace {
            score: DpMatrix::with_capacity(rows, cols),
            insertion: DpMatrix::with_capacity(rows, cols),
            deletion: DpMatrix::with_capacity(rows, cols),
        }
    }

    /// Zeroes and resizes the matrices used by one alignment; the gap matrices are only touched
    /// when affine gaps are scored.
    pub fn reset(&mut self, rows: usize, cols: usize, affine: bool) {
        self.score.reset(rows, cols);
        if affine {
            self.insertion.reset(rows, cols);
            self.deletion.reset(rows, cols);
        }
    }
}

/// Scratch matrices for a single alignment: either supplied (and kept) by the caller, or
/// allocated for the call and dropped when it returns.
pub enum Scratch<'a> {
    Owned(Box<Workspace>),
    Borrowed(&'a mut Workspace),
}

impl<'a> Scratch<'a> {
    pub fn new(workspace: Option<&'a mut Workspace>) -> Self {
        match workspace {
            Some(workspace) => Scratch::Borrowed(workspace),
            None => Scratch::Owned(Box::default()),
        }
    }
}

impl Deref for Scratch<'_> {
    type Target = Workspace;

    fn deref(&self) -> &Workspace {
        match self {
            Scratch::Owned(workspace) => workspace,
            Scratch::Borrowed(workspace) => workspace,
        }
    }
}

impl DerefMut for Scratch<'_> {
    fn deref_mut(&mut self) -> &mut Workspace {
        match self {
            Scratch::Owned(workspace) => workspace,
            Scratch::Borrowed(workspace) => workspace,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::{DpMatrix, Scratch, Workspace};
    use rstest::rstest;

    #[rstest]
    fn test_flat_and_grid_access_agree() {
        let mut matrix = DpMatrix::default();
        matrix.reset(3, 4);
        matrix.set(2, 1, 7.5);
        assert_eq!(matrix.index(2, 1), 9);
        assert_eq!(matrix.at(9), 7.5);
        matrix.put(matrix.index(1, 3), -1.0);
        assert_eq!(matrix.get(1, 3), -1.0);
        matrix.put(11, 2.0);
        assert_eq!(matrix.last(), 2.0);
    }

    #[rstest]
    fn test_reset_zeroes() {
        let mut matrix = DpMatrix::with_capacity(2, 2);
        matrix.reset(2, 2);
        matrix.set(1, 1, 3.0);
        matrix.reset(3, 1);
        assert_eq!((matrix.rows(), matrix.cols()), (3, 1));
        assert!((0..3).all(|i| matrix.get(i, 0) == 0.0));
    }

    #[rstest]
    fn test_borrowed_scratch_writes_through() {
        let mut workspace = Workspace::default();
        {
            let mut scratch = Scratch::new(Some(&mut workspace));
            scratch.reset(2, 3, true);
            scratch.score.set(1, 2, 4.0);
        }
        assert_eq!(workspace.score.get(1, 2), 4.0);
        assert_eq!(workspace.deletion.rows(), 2);

        let mut owned = Scratch::new(None);
        owned.reset(1, 1, false);
        assert!(matches!(owned, Scratch::Owned(_)));
        assert_eq!(owned.insertion.rows(), 0);
    }
}
