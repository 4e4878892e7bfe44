use super::command::{Command, ValueEnum};
use anyhow::{Context, Result};
use clap::{
    builder::{PossibleValuesParser, TypedValueParser as _},
    Parser,
};
use codalign::{
    align::{
        io::{
            read_reference, write_fasta, FastaGroupingIterator, FastaOwnedRecord,
            FastaThreadReader, OutputMessage, OutputResult, READER_CHANNEL_NUM_CHUNKS,
        },
        AlignmentMode, Builder, DataType, OutputFormat, Scoring, Space,
    },
    util::{version::built_info, NUM_CPU},
};
use fgoxide::io::Io;
use log::{info, warn};
use proglog::{CountFormatterKind, ProgLog, ProgLogBuilder};
use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
    sync::Arc,
    thread::JoinHandle,
};

////////////////////////////////////////////////////////////////////////////////
// Align (main class) and it's impls
////////////////////////////////////////////////////////////////////////////////

impl ValueEnum for AlignmentMode {
    fn variants<'a>() -> &'a [Self] {
        &[Self::Trim, Self::Global, Self::Local]
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Self::Trim => Some("Gaps before and after either sequence are free"),
            Self::Global => Some("Every gap is charged"),
            Self::Local => Some(
                "The alignment ends at the best scoring position anywhere; the unaligned tails \
                 are still written, as gaps against the other sequence",
            ),
        }
    }
}

impl ValueEnum for DataType {
    fn variants<'a>() -> &'a [Self] {
        &[Self::Nucleotide, Self::Protein, Self::Codon]
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Self::Codon => Some("Nucleotides aligned as reference codons, allowing frameshifts"),
            _ => None,
        }
    }
}

impl ValueEnum for OutputFormat {
    fn variants<'a>() -> &'a [Self] {
        &[Self::RefMap, Self::Pairwise]
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Self::RefMap => Some("Only the query, mapped onto the reference"),
            Self::Pairwise => Some("The aligned reference and query"),
        }
    }
}

impl ValueEnum for Space {
    fn variants<'a>() -> &'a [Self] {
        &[Self::Quadratic, Self::Linear]
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Self::Quadratic => Some("Full score matrices"),
            Self::Linear => {
                Some("Divide and conquer over single rows; not for codon data or local mode")
            }
        }
    }
}

/// Aligns query sequences to a single reference sequence.
///
/// Each query in the input FASTA is aligned independently to the first sequence of the
/// reference FASTA.  Sequences may be nucleotides, amino acids, or nucleotides aligned in codon
/// space, where the reference is read as a sequence of codons and the query may carry frameshifts
/// (insertions or deletions that are not a multiple of three).  Bases involved in a frameshift
/// are written in lower case.
///
/// ## Scoring
///
/// Nucleotide alignment uses a built-in scoring model unless `--scores` is given.  Protein and
/// codon alignment require a scoring file: an INI-like file with `[ALPHABET]`, `[MATRIX]` and
/// `[PARAMETERS]` sections (plus `[CODE]` with the amino-acid alphabet and the 64 codon
/// translations for codon models).
///
/// ## Output
///
/// With `--format refmap` (the default) each query is written in reference coordinates: bases
/// inserted relative to the reference are dropped, so every output sequence has the length of the
/// reference.  With `--format pairwise` both aligned sequences are written for every query.
///
/// Consecutive queries with identical sequences are aligned once.
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width=0)]
pub struct Align {
    /// The path to the reference FASTA; only the first sequence is used.
    #[clap(long, short = 'r', display_order = 1)]
    reference: PathBuf,

    /// The path to the query FASTA, or `-` for standard input.
    #[clap(default_value = "-")]
    input: PathBuf,

    /// The path to the output FASTA, standard output if not given.
    #[clap(long, short = 'o', display_order = 2)]
    output: Option<PathBuf>,

    /// The path to the scoring file.
    #[clap(long, short = 's', display_order = 3)]
    scores: Option<PathBuf>,

    /// The kind of sequences being aligned.
    #[clap(
        long,
        short = 't',
        value_parser = PossibleValuesParser::new(DataType::possible_values())
            .map(|s| s.parse::<DataType>().unwrap()),
        default_value_t = DataType::Nucleotide,
        ignore_case = true,
        display_order = 4
    )]
    data_type: DataType,

    /// How the ends of the sequences are treated.
    #[clap(
        long,
        short = 'l',
        value_parser = PossibleValuesParser::new(AlignmentMode::possible_values())
            .map(|s| s.parse::<AlignmentMode>().unwrap()),
        default_value_t = AlignmentMode::Trim,
        ignore_case = true,
        display_order = 5
    )]
    local: AlignmentMode,

    /// The output format.
    #[clap(
        long,
        short = 'f',
        value_parser = PossibleValuesParser::new(OutputFormat::possible_values())
            .map(|s| s.parse::<OutputFormat>().unwrap()),
        default_value_t = OutputFormat::RefMap,
        ignore_case = true,
        display_order = 6
    )]
    format: OutputFormat,

    /// Memory used by the dynamic program.
    #[clap(
        long,
        short = 'S',
        value_parser = PossibleValuesParser::new(Space::possible_values())
            .map(|s| s.parse::<Space>().unwrap()),
        default_value_t = Space::Quadratic,
        ignore_case = true,
        display_order = 7
    )]
    space: Space,

    /// Use linear gap costs (every gapped position costs the open cost).
    #[clap(long, short = 'a', default_value = "false", display_order = 8)]
    no_affine: bool,

    /// In refmap format, write the reference as the first record.
    #[clap(long, short = 'I', default_value = "false", display_order = 9)]
    include_reference: bool,

    /// Do not log progress.
    #[clap(long, short = 'q', default_value = "false", display_order = 10)]
    quiet: bool,

    /// The number of threads to use.
    #[clap(long, short = 'T', default_value = NUM_CPU.as_str(), display_order = 11)]
    threads: usize,

    /// Assume an unrecognized input (based on file extension) is GZIP compressed.
    #[clap(long, short = 'z', default_value = "false", display_order = 12)]
    decompress: bool,
}

impl Align {
    fn writer(&self) -> Result<Box<dyn Write>> {
        match &self.output {
            Some(path) => {
                let fg_io = Io::default();
                let writer = fg_io
                    .new_writer(path)
                    .with_context(|| format!("Error opening output: {}", path.display()))?;
                Ok(Box::new(writer) as Box<dyn Write>)
            }
            None => Ok(Box::new(BufWriter::new(io::stdout().lock())) as Box<dyn Write>),
        }
    }

    /// Writes one query in the requested format; the reference is written once before the first
    /// query in refmap format when requested.
    fn write_result(
        &self,
        writer: &mut dyn Write,
        reference: &FastaOwnedRecord,
        result: &OutputResult,
        written: &mut usize,
    ) -> Result<()> {
        let (record, alignment) = result;
        let alignment = match alignment {
            Ok(alignment) => alignment,
            Err(e) => {
                warn!("Skipping query {}: {}", record.name(), e);
                return Ok(());
            }
        };
        match self.format {
            OutputFormat::Pairwise => {
                write_fasta(writer, &reference.head, &alignment.reference)?;
                write_fasta(writer, &record.head, &alignment.query)?;
            }
            OutputFormat::RefMap => {
                if self.include_reference && *written == 0 {
                    write_fasta(writer, &reference.head, &reference.seq)?;
                }
                write_fasta(writer, &record.head, &alignment.query)?;
            }
        }
        *written += 1;
        Ok(())
    }

    /// Executes the align command
    pub fn execute(&self) -> anyhow::Result<()> {
        info!("Running {}", built_info::banner());
        info!("Starting alignment...");
        info!("Reading reference FASTA from {}", self.reference.display());
        info!("Reading query FASTA from {}", self.input.display());
        info!(
            "Data type: {}, mode: {}, format: {}, space: {}, affine: {}",
            self.data_type, self.local, self.format, self.space, !self.no_affine
        );
        let progress_logger: Option<ProgLog> = if self.quiet {
            None
        } else {
            Some(
                ProgLogBuilder::new()
                    .name("codalign-progress")
                    .noun("queries")
                    .verb("Aligned")
                    .unit((READER_CHANNEL_NUM_CHUNKS * self.threads.max(1)).try_into()?)
                    .count_formatter(CountFormatterKind::Comma)
                    .build(),
            )
        };

        // The scoring model and the reference are shared across threads
        let scoring = Arc::new(Scoring::load(self.data_type, self.scores.as_ref())?);
        let reference = Arc::new(read_reference(&self.reference)?);
        scoring
            .validate_reference(&reference.seq)
            .with_context(|| format!("Invalid reference: {}", reference.name()))?;
        info!(
            "Reference {} has {} symbols",
            reference.name(),
            reference.seq.len()
        );

        // Create the Builder - we will use this when initializing each thread to create its own
        // Aligner.
        let mut builder = Builder::default();
        builder
            .mode(self.local)
            .affine(!self.no_affine)
            .space(self.space)
            .format(self.format);
        // fail on unsupported options before reading any query
        builder.build_aligner(&scoring)?;
        let builder = Arc::new(builder);

        // Create the thread to read in the FASTA records
        let FastaThreadReader {
            handle: reader_handle,
            to_align_rx,
            to_output_rx,
        } = FastaThreadReader::new(self.input.clone(), self.decompress, self.threads.max(1));

        // Create and start the aligner threads
        let thread_handles: Vec<JoinHandle<Result<()>>> = (0..self.threads.max(1))
            .map(|_| {
                let to_align_rx = to_align_rx.clone();
                let scoring = Arc::clone(&scoring);
                let reference = Arc::clone(&reference);
                let builder = Arc::clone(&builder);

                std::thread::spawn(move || {
                    let mut aligner = builder.build_aligner(&scoring)?;
                    for msg in to_align_rx.iter() {
                        let mut results: Vec<OutputResult> = Vec::with_capacity(msg.records.len());
                        for group in FastaGroupingIterator::new(msg.records.into_iter()) {
                            let result = aligner.align(&reference.seq, &group[0].seq);
                            results.extend(
                                group.into_iter().map(|record| (record, result.clone())),
                            );
                        }
                        // the writer has gone away
                        if msg.oneshot.send(OutputMessage { results }).is_err() {
                            break;
                        }
                    }
                    Ok(())
                })
            })
            .collect();
        drop(to_align_rx);

        // Write the alignments in input order
        let mut writer = self.writer()?;
        let mut written = 0;
        let mut failed = 0;
        for receiver in to_output_rx.iter() {
            let msg = match receiver.recv() {
                Ok(msg) => msg,
                Err(_) => break, // an aligner thread failed
            };
            for result in &msg.results {
                if let Some(progress_logger) = &progress_logger {
                    progress_logger.record();
                }
                if result.1.is_err() {
                    failed += 1;
                }
                self.write_result(writer.as_mut(), &reference, result, &mut written)?;
            }
        }
        writer.flush()?;
        drop(to_output_rx);

        // All done, shut down the alignment and reader threads
        thread_handles
            .into_iter()
            .try_for_each(|handle| match handle.join() {
                Ok(result) => result,
                Err(e) => std::panic::resume_unwind(e),
            })?;
        match reader_handle.join() {
            Ok(result) => result?,
            Err(e) => std::panic::resume_unwind(e),
        };

        info!("Wrote {} alignments", written);
        if failed > 0 {
            warn!("Skipped {} queries that could not be aligned", failed);
        }
        Ok(())
    }
}

impl Command for Align {
    fn execute(&self) -> anyhow::Result<()> {
        Align::execute(self)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use codalign::align::{AlignmentMode, DataType, OutputFormat, Space};
    use rstest::rstest;

    use super::{Align, ValueEnum};

    /// Check that the argument parser works
    #[test]
    fn test_parse() {
        let align = Align::parse_from(["align", "-r", "ref.fa"]);
        assert_eq!(align.input.to_str(), Some("-"));
        assert_eq!(align.local, AlignmentMode::Trim);
        assert_eq!(align.format, OutputFormat::RefMap);
        assert_eq!(align.space, Space::Quadratic);
        assert_eq!(align.data_type, DataType::Nucleotide);
        assert!(!align.no_affine);
    }

    #[rstest]
    #[case("global", AlignmentMode::Global)]
    #[case("LOCAL", AlignmentMode::Local)]
    fn test_parse_options(#[case] mode: &str, #[case] expected: AlignmentMode) {
        let align = Align::parse_from([
            "align", "-r", "ref.fa", "-l", mode, "-f", "pairwise", "-S", "linear", "-t", "codon",
            "-a", "-T", "4", "queries.fa",
        ]);
        assert_eq!(align.local, expected);
        assert_eq!(align.format, OutputFormat::Pairwise);
        assert_eq!(align.space, Space::Linear);
        assert_eq!(align.data_type, DataType::Codon);
        assert!(align.no_affine);
        assert_eq!(align.threads, 4);
        assert_eq!(align.input.to_str(), Some("queries.fa"));
    }

    #[test]
    fn test_local_help_mentions_unaligned_tails() {
        let help = AlignmentMode::Local.help().unwrap();
        assert!(help.contains("tails"));
        assert!(help.contains("gaps"));
        assert_eq!(
            AlignmentMode::possible_values().len(),
            AlignmentMode::variants().len()
        );
    }
}
