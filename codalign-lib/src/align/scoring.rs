use super::{
    aligners::constants::{Score, MIN_SCORE},
    error::AlignError,
};
use crate::util::config::ConfigFile;
use anyhow::{anyhow, Context, Error, Result};
use derive_getters::Getters;
use itertools::Itertools;
use log::debug;
use std::{fmt::Display, path::Path, str::FromStr};

/// The nucleotide alphabet, in the order used to number codons.
pub const NUCLEOTIDE_ALPHABET: &[u8; 4] = b"ACGT";

/// The gap character written into aligned sequences.
pub const GAP_CHAR: u8 = b'-';

/// Standard genetic code for codons `AAA, AAC, AAG, AAT, ACA, ..., TTT`, with `X` for stops.
pub const STANDARD_GENETIC_CODE: &[u8; 64] =
    b"KNKNTTTTRSRSIIMIQHQHPPPPRRRRLLLLEDEDAAAAGGGGVVVVXYXYSSSSXCWCLFLF";

/// Code of a byte that is outside of the alphabet and cannot be scored.
pub const UNSCORABLE: i16 = -1;

/// Number of distinct codons; also the index of the unresolved codon.
pub const NUM_CODONS: usize = 64;

/// Row length of the codon scoring matrix (64 codons plus the unresolved codon).
pub const CODON_STRIDE: usize = NUM_CODONS + 1;

/// Built-in nucleotide scores over `ACGT` plus the unresolved symbol.
const NUCLEOTIDE_SCORES: [Score; 25] = [
    5., -4., -4., -4., -5., //
    -4., 5., -1., -4., -5., //
    -4., -4., 5., -4., -5., //
    -4., -4., -4., 5., -5., //
    -5., -5., -5., -5., 1.,
];

/// Score of a codon pair where one side, and only one side, is a stop codon.
const STOP_CODON_PENALTY: Score = -1.0e4;

/// Subtracted from the amino-acid score of two different codons.
const CODON_MISMATCH_PENALTY: Score = 0.5;

/// The minimum number of amino-acid symbols in a codon scoring model.
const MIN_AMINO_ACIDS: usize = 21;

/// Symbol marking stop codons in the amino-acid alphabet.
const STOP_SYMBOL: u8 = b'X';

/// Symbol marking unresolved codons in the amino-acid alphabet.
const UNRESOLVED_SYMBOL: u8 = b'*';

/// Kind of sequence being aligned.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub enum DataType {
    #[default]
    Nucleotide,
    Protein,
    Codon,
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nucleotide => write!(f, "nucleotide"),
            Self::Protein => write!(f, "protein"),
            Self::Codon => write!(f, "codon"),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nucleotide" | "dna" => Ok(DataType::Nucleotide),
            "protein" | "aa" => Ok(DataType::Protein),
            "codon" => Ok(DataType::Codon),
            _ => Err(anyhow!("Invalid data type: {}", s)),
        }
    }
}

/// Gap costs, given as positive penalties.  An insertion places query symbols against a gap in
/// the reference; a deletion places reference symbols against a gap in the query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GapCosts {
    pub open_insertion: Score,
    pub extend_insertion: Score,
    pub open_deletion: Score,
    pub extend_deletion: Score,
}

impl GapCosts {
    pub fn new(
        open_insertion: Score,
        extend_insertion: Score,
        open_deletion: Score,
        extend_deletion: Score,
    ) -> Self {
        Self {
            open_insertion,
            extend_insertion,
            open_deletion,
            extend_deletion,
        }
    }

    /// The same open and extend costs on both sequences.
    pub fn symmetric(open: Score, extend: Score) -> Self {
        Self::new(open, extend, open, extend)
    }

    /// Reads the `[PARAMETERS]` costs.  The file names gaps by the sequence they delete from:
    /// `*_deletion` keys cost gaps in the reference (our insertions) and `*_insertion` keys cost
    /// gaps in the query (our deletions).
    fn from_config(config: &ConfigFile) -> Result<Self> {
        Ok(Self::new(
            config.get("PARAMETERS", "open_deletion")?,
            config.get("PARAMETERS", "extend_deletion")?,
            config.get("PARAMETERS", "open_insertion")?,
            config.get("PARAMETERS", "extend_insertion")?,
        ))
    }
}

impl Default for GapCosts {
    fn default() -> Self {
        Self::symmetric(10.0, 0.5)
    }
}

/// Maps every byte to its index in an alphabet.
#[derive(Clone, Debug)]
pub struct CharMap([i16; 256]);

impl CharMap {
    /// Builds the map; bytes outside the alphabet map to `not_found`.
    pub fn new(alphabet: &[u8], not_found: i16) -> Result<Self, AlignError> {
        if alphabet.is_empty() {
            return Err(AlignError::config("empty alphabet"));
        }
        if alphabet.iter().unique().count() != alphabet.len() {
            return Err(AlignError::config(format!(
                "alphabet has repeated symbols: {}",
                String::from_utf8_lossy(alphabet)
            )));
        }
        let mut codes = [not_found; 256];
        for (index, &symbol) in alphabet.iter().enumerate() {
            codes[symbol as usize] = index as i16;
        }
        Ok(Self(codes))
    }

    #[inline(always)]
    pub fn code(&self, symbol: u8) -> i16 {
        self.0[symbol as usize]
    }

    pub fn encode(&self, seq: &[u8]) -> Vec<i16> {
        seq.iter().map(|&symbol| self.code(symbol)).collect()
    }
}

/// Number of a codon given its three nucleotide codes, `None` if any of them is not a resolved
/// nucleotide.
#[inline]
pub fn codon_index(first: i16, second: i16, third: i16) -> Option<usize> {
    if first < 0 || second < 0 || third < 0 {
        None
    } else {
        Some(((first as usize * 4) + second as usize) * 4 + third as usize)
    }
}

/// Codon-specific scoring: the genetic code and the partial-codon tables that score a reference
/// codon against fewer (3x1, 3x2) or more (3x4, 3x5) than three query nucleotides.
///
/// Table layouts, for a reference codon `c` (64 for unresolved):
/// - `s3x1[12c + 3n + p]`: nucleotide `n` in codon position `p`, best over the other two.
/// - `s3x2[48c + 3(4n1 + n2) + p]`: `n1 n2` at positions `(0,1)`, `(0,2)` or `(1,2)`.
/// - `s3x4[256c + 4q + i]` and `s3x5[640c + 10q + i]`: the full score against codon `q`, one
///   copy per way of choosing three of the four or five query nucleotides.
#[derive(Clone, Debug, Getters)]
pub struct CodonScoring {
    amino_acids: Vec<u8>,
    translations: [usize; NUM_CODONS],
    stop_index: usize,
    unresolved_index: usize,
    frameshift_cost: Score,
    s3x1: Vec<Score>,
    s3x2: Vec<Score>,
    s3x4: Vec<Score>,
    s3x5: Vec<Score>,
}

impl CodonScoring {
    /// True if the codon translates to a stop.
    pub fn is_stop(&self, codon: usize) -> bool {
        codon < NUM_CODONS && self.translations[codon] == self.stop_index
    }

    /// The amino-acid symbol of the codon; the unresolved symbol for index 64.
    pub fn translate(&self, codon: usize) -> u8 {
        if codon < NUM_CODONS {
            self.amino_acids[self.translations[codon]]
        } else {
            self.amino_acids[self.unresolved_index]
        }
    }
}

/// Everything the engine needs to score a pair of symbols and the gaps between them.
#[derive(Clone, Debug, Getters)]
pub struct Scoring {
    /// The symbols of the alphabet; `ACGT` in codon mode.
    alphabet: Vec<u8>,
    char_map: CharMap,
    /// The number of resolved symbols (64 in codon mode); the matrix has one more row/column for
    /// the unresolved symbol.
    dim: usize,
    /// Row-major `(dim + 1) x (dim + 1)` scores, rows indexed by the reference symbol.
    matrix: Vec<Score>,
    gaps: GapCosts,
    gap_char: u8,
    codon: Option<CodonScoring>,
}

impl Scoring {
    /// A scoring model over the given alphabet.  Symbols outside the alphabet score as the
    /// unresolved symbol (the last row/column of the matrix).
    pub fn new(alphabet: &[u8], matrix: Vec<Score>, gaps: GapCosts) -> Result<Self, AlignError> {
        Self::simple(alphabet, matrix, gaps, alphabet.len() as i16)
    }

    /// The built-in nucleotide model: match 5, mismatch -4 (-1 for a reference C against a
    /// query G), N scored as the unresolved symbol, gaps opened at 10 and extended at 0.5.
    pub fn nucleotide() -> Self {
        // the built-in tables are well formed
        match Self::new(
            NUCLEOTIDE_ALPHABET,
            NUCLEOTIDE_SCORES.to_vec(),
            GapCosts::default(),
        ) {
            Ok(scoring) => scoring,
            Err(e) => unreachable!("built-in nucleotide scoring is invalid: {e}"),
        }
    }

    fn simple(
        alphabet: &[u8],
        matrix: Vec<Score>,
        gaps: GapCosts,
        not_found: i16,
    ) -> Result<Self, AlignError> {
        let char_map = CharMap::new(alphabet, not_found)?;
        let dim = alphabet.len();
        if matrix.len() != (dim + 1) * (dim + 1) {
            return Err(AlignError::config(format!(
                "the cost matrix has {} entries but an alphabet of {} symbols needs {}",
                matrix.len(),
                dim,
                (dim + 1) * (dim + 1)
            )));
        }
        Ok(Self {
            alphabet: alphabet.to_vec(),
            char_map,
            dim,
            matrix,
            gaps,
            gap_char: GAP_CHAR,
            codon: None,
        })
    }

    /// A nucleotide or protein model read from `ALPHABET:alphabet`, `MATRIX:cost` and the
    /// `PARAMETERS` gap costs.  Symbols outside the alphabet cannot be scored.
    pub fn from_config(config: &ConfigFile) -> Result<Self> {
        let alphabet: String = config.get("ALPHABET", "alphabet")?;
        let matrix: Vec<Score> = config.get_vec("MATRIX", "cost")?;
        let gaps = GapCosts::from_config(config)?;
        let scoring = Self::simple(alphabet.as_bytes(), matrix, gaps, UNSCORABLE)?;
        debug!(
            "Read a scoring model with {} symbols: {}",
            scoring.dim, alphabet
        );
        Ok(scoring)
    }

    /// A codon model from an amino-acid alphabet (which must contain `X` for stop codons and `*`
    /// for unresolved codons), its square score matrix, and the translation of the 64 codons.
    /// Negative gap or frameshift costs are replaced with defaults derived from the range of the
    /// amino-acid scores.
    pub fn codon_model(
        amino_acids: &[u8],
        aa_scores: &[Score],
        translations: &[u8],
        gaps: GapCosts,
        frameshift_cost: Score,
    ) -> Result<Self, AlignError> {
        let amino_acids = amino_acids.to_ascii_uppercase();
        let num_aa = amino_acids.len();
        if num_aa < MIN_AMINO_ACIDS {
            return Err(AlignError::config(format!(
                "incomplete amino-acid alphabet of {num_aa} symbols"
            )));
        }
        let aa_map = CharMap::new(&amino_acids, UNSCORABLE)?;
        let stop_index = usize::try_from(aa_map.code(STOP_SYMBOL)).map_err(|_| {
            AlignError::config("could not find the stop codon character 'X' in the amino acids")
        })?;
        let unresolved_index = usize::try_from(aa_map.code(UNRESOLVED_SYMBOL)).map_err(|_| {
            AlignError::config("could not find the unresolved character '*' in the amino acids")
        })?;
        if aa_scores.len() != num_aa * num_aa {
            return Err(AlignError::config(format!(
                "the amino-acid cost matrix has {} entries, expected {}",
                aa_scores.len(),
                num_aa * num_aa
            )));
        }
        if translations.len() != NUM_CODONS {
            return Err(AlignError::config(format!(
                "expected 64 codon translations, found {}",
                translations.len()
            )));
        }
        let mut translation_indices = [0; NUM_CODONS];
        for (codon, &symbol) in translations.iter().enumerate() {
            let code = aa_map.code(symbol.to_ascii_uppercase());
            translation_indices[codon] = usize::try_from(code).map_err(|_| {
                AlignError::config(format!(
                    "translation '{}' is not one of the amino acids",
                    symbol as char
                ))
            })?;
        }

        let matrix = codon_matrix(
            aa_scores,
            num_aa,
            &translation_indices,
            stop_index,
            unresolved_index,
        );
        let (s3x1, s3x2, s3x4, s3x5) = partial_codon_tables(&matrix);

        let max_score = aa_scores.iter().fold(0.0 as Score, |acc, &s| acc.max(s));
        let min_score = aa_scores.iter().fold(Score::INFINITY, |acc, &s| acc.min(s));
        let indel_cost = max_score.max(-min_score);
        let extend_cost = 3.0 * (max_score - min_score) / 40.0;
        let pick = |value: Score, default: Score| if value < 0.0 { default } else { value };
        let gaps = GapCosts::new(
            pick(gaps.open_insertion, 2.0 * indel_cost),
            pick(gaps.extend_insertion, extend_cost),
            pick(gaps.open_deletion, 2.0 * indel_cost),
            pick(gaps.extend_deletion, extend_cost),
        );
        let frameshift_cost = pick(frameshift_cost, 3.0 * indel_cost);
        debug!(
            "Codon scoring over {} amino acids: gaps {:?}, frameshift cost {}",
            num_aa, gaps, frameshift_cost
        );

        Ok(Self {
            alphabet: NUCLEOTIDE_ALPHABET.to_vec(),
            char_map: CharMap::new(NUCLEOTIDE_ALPHABET, UNSCORABLE)?,
            dim: NUM_CODONS,
            matrix,
            gaps,
            gap_char: GAP_CHAR,
            codon: Some(CodonScoring {
                amino_acids,
                translations: translation_indices,
                stop_index,
                unresolved_index,
                frameshift_cost,
                s3x1,
                s3x2,
                s3x4,
                s3x5,
            }),
        })
    }

    /// A codon model read from `CODE:aminoacids`, `MATRIX:cost`, `CODE:translations`, the
    /// `PARAMETERS` gap costs and `PARAMETERS:frameshift_cost`.
    pub fn codon_from_config(config: &ConfigFile) -> Result<Self> {
        let amino_acids: String = config.get("CODE", "aminoacids")?;
        let aa_scores: Vec<Score> = config.get_vec("MATRIX", "cost")?;
        let tokens: Vec<String> = config.get_vec("CODE", "translations")?;
        if let Some(token) = tokens.iter().find(|token| token.len() != 1) {
            return Err(anyhow!(
                "All entries in CODE:translations must have length 1, found '{}'",
                token
            ));
        }
        let translations = tokens.iter().map(|token| token.as_bytes()[0]).collect_vec();
        let gaps = GapCosts::from_config(config)?;
        let frameshift_cost: Score = config.get("PARAMETERS", "frameshift_cost")?;
        Ok(Self::codon_model(
            amino_acids.as_bytes(),
            &aa_scores,
            &translations,
            gaps,
            frameshift_cost,
        )?)
    }

    /// Loads the model for the data type: the built-in nucleotide model when no file is given,
    /// otherwise the file read as a simple or codon model.
    pub fn load<P: AsRef<Path>>(data_type: DataType, path: Option<&P>) -> Result<Self> {
        match (data_type, path) {
            (DataType::Nucleotide, None) => Ok(Self::nucleotide()),
            (_, None) => Err(anyhow!(
                "Default scoring is only available for nucleotide data, provide a scoring file for {} data",
                data_type
            )),
            (DataType::Codon, Some(path)) => {
                Self::codon_from_config(&ConfigFile::from_path(path)?).with_context(|| {
                    format!("Invalid codon scoring file: {}", path.as_ref().display())
                })
            }
            (_, Some(path)) => Self::from_config(&ConfigFile::from_path(path)?)
                .with_context(|| format!("Invalid scoring file: {}", path.as_ref().display())),
        }
    }

    /// The model aligns codons.
    pub fn is_codon(&self) -> bool {
        self.codon.is_some()
    }

    /// Row length of the score matrix.
    #[inline(always)]
    pub fn stride(&self) -> usize {
        self.dim + 1
    }

    /// Score of two symbol codes, `None` if either cannot be scored.
    #[inline(always)]
    pub fn pair_score(&self, reference: i16, query: i16) -> Option<Score> {
        if reference < 0 || query < 0 {
            None
        } else {
            Some(self.matrix[reference as usize * self.stride() + query as usize])
        }
    }

    /// Score of a reference symbol against a query symbol; zero if either cannot be scored.
    pub fn cost(&self, reference: u8, query: u8) -> Score {
        self.pair_score(self.char_map.code(reference), self.char_map.code(query))
            .unwrap_or(0.0)
    }

    /// Cost of a partial-codon move that shifts the reading frame; zero outside codon mode.
    pub fn miscall_cost(&self) -> Score {
        self.codon.as_ref().map_or(0.0, |codon| codon.frameshift_cost)
    }

    /// Checks that a reference can be aligned in codon space: a whole number of codons, none of
    /// which is a stop codon.  Always succeeds for non-codon models.
    pub fn validate_reference(&self, reference: &[u8]) -> Result<(), AlignError> {
        let codon = match self.codon.as_ref() {
            Some(codon) => codon,
            None => return Ok(()),
        };
        if reference.len() % 3 != 0 {
            return Err(AlignError::FrameMismatch {
                len: reference.len(),
            });
        }
        for (index, triplet) in reference.chunks_exact(3).enumerate() {
            let code = codon_index(
                self.char_map.code(triplet[0]),
                self.char_map.code(triplet[1]),
                self.char_map.code(triplet[2]),
            );
            if code.map_or(false, |c| codon.is_stop(c)) {
                return Err(AlignError::config(format!(
                    "the reference has a stop codon ({}) at codon {}",
                    String::from_utf8_lossy(triplet),
                    index + 1
                )));
            }
        }
        Ok(())
    }
}

/// The 65x65 codon scoring matrix derived from the amino-acid scores.
fn codon_matrix(
    aa_scores: &[Score],
    num_aa: usize,
    translations: &[usize; NUM_CODONS],
    stop_index: usize,
    unresolved_index: usize,
) -> Vec<Score> {
    let mut matrix = Vec::with_capacity(CODON_STRIDE * CODON_STRIDE);
    for (codon1, &aa1) in translations.iter().enumerate() {
        for (codon2, &aa2) in translations.iter().enumerate() {
            if (aa1 == stop_index || aa2 == stop_index) && aa1 != aa2 {
                matrix.push(STOP_CODON_PENALTY);
            } else {
                let mut score = aa_scores[aa1 * num_aa + aa2];
                if codon1 != codon2 {
                    score -= CODON_MISMATCH_PENALTY;
                }
                matrix.push(score);
            }
        }
        // against the unresolved codon
        matrix.push(0.0);
    }
    matrix.extend(std::iter::repeat(0.0).take(NUM_CODONS));
    matrix.push(aa_scores[unresolved_index * num_aa + unresolved_index]);
    matrix
}

/// Builds the 3x1, 3x2, 3x4 and 3x5 tables from the codon scoring matrix.
fn partial_codon_tables(matrix: &[Score]) -> (Vec<Score>, Vec<Score>, Vec<Score>, Vec<Score>) {
    let mut s3x1 = Vec::with_capacity(CODON_STRIDE * 12);
    let mut s3x2 = Vec::with_capacity(CODON_STRIDE * 48);
    let mut s3x4 = Vec::with_capacity(CODON_STRIDE * 256);
    let mut s3x5 = Vec::with_capacity(CODON_STRIDE * 640);
    for codon in 0..NUM_CODONS {
        let score = |other: usize| matrix[codon * CODON_STRIDE + other];
        for d1 in 0..4 {
            let (mut max100, mut max010, mut max001) = (MIN_SCORE, MIN_SCORE, MIN_SCORE);
            for d2 in 0..4 {
                let (mut max110, mut max101, mut max011) = (MIN_SCORE, MIN_SCORE, MIN_SCORE);
                for d3 in 0..4 {
                    let full = score(16 * d1 + 4 * d2 + d3);
                    s3x5.extend(std::iter::repeat(full).take(10));
                    s3x4.extend(std::iter::repeat(full).take(4));

                    // d1 observed alone
                    max100 = max100.max(score(16 * d1 + 4 * d2 + d3));
                    max010 = max010.max(score(16 * d2 + 4 * d1 + d3));
                    max001 = max001.max(score(16 * d2 + 4 * d3 + d1));

                    // d1 then d2 observed
                    max110 = max110.max(score(16 * d1 + 4 * d2 + d3));
                    max101 = max101.max(score(16 * d1 + 4 * d3 + d2));
                    max011 = max011.max(score(16 * d3 + 4 * d1 + d2));
                }
                s3x2.extend([max110, max101, max011]);
            }
            s3x1.extend([max100, max010, max001]);
        }
    }
    // the unresolved reference codon scores zero against everything
    s3x1.extend(std::iter::repeat(0.0).take(12));
    s3x2.extend(std::iter::repeat(0.0).take(48));
    s3x4.extend(std::iter::repeat(0.0).take(256));
    s3x5.extend(std::iter::repeat(0.0).take(640));
    (s3x1, s3x2, s3x4, s3x5)
}
