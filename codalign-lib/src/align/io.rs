use super::{alignment::Alignment, error::AlignError};
use crate::util::io::{is_fasta_path, is_gzip_path};
use anyhow::{ensure, Context, Result};
use derive_getters::Getters;
use fgoxide::io::Io;
use flate2::bufread::MultiGzDecoder;
use flume::{bounded, Receiver, Sender};
use seq_io::fasta::{Reader as FastaReader, RefRecord as FastaRefRecord};
use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Write},
    iter::Peekable,
    path::{Path, PathBuf},
    thread::JoinHandle,
};

/// 128 KB default buffer size, same as pigz.
pub const GZ_BUFSIZE: usize = 64 * (1 << 10) * 2;

/// The number of FASTA records to include per chunk.
pub const RECORDS_PER_CHUNK_PER_THREAD: usize = 10;

/// The number of chunks allowed in a channel
pub const READER_CHANNEL_NUM_CHUNKS: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Getters)]
/// An owned FASTA record with an upper-cased sequence.
pub struct FastaOwnedRecord {
    pub head: Vec<u8>,
    pub seq: Vec<u8>,
}

impl FastaOwnedRecord {
    pub fn from_fasta(record: &FastaRefRecord) -> Self {
        let owned_record = record.to_owned_record();
        Self {
            head: owned_record.head,
            seq: owned_record.seq.to_ascii_uppercase(),
        }
    }

    /// The header line as text.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.head).to_string()
    }
}

/// Reads the first record of a (possibly gzipped) FASTA file.
pub fn read_reference<P: AsRef<Path>>(path: &P) -> Result<FastaOwnedRecord> {
    let fg_io: Io = Io::new(5, GZ_BUFSIZE);
    let reader = fg_io
        .new_reader(path)
        .with_context(|| format!("Error opening reference: {}", path.as_ref().display()))?;
    let mut source: FastaReader<Box<dyn BufRead + Send>> =
        FastaReader::with_capacity(reader, GZ_BUFSIZE);
    let record = source
        .next()
        .transpose()
        .with_context(|| format!("Error reading reference: {}", path.as_ref().display()))?
        .map(|r| FastaOwnedRecord::from_fasta(&r))
        .with_context(|| {
            format!("Found no sequences in the reference FASTA: {}", path.as_ref().display())
        })?;
    ensure!(!record.seq.is_empty(), "The reference sequence is empty");
    Ok(record)
}

/// Writes a single FASTA record, the sequence on one line.
pub fn write_fasta<W: Write + ?Sized>(
    writer: &mut W,
    head: &[u8],
    seq: &[u8],
) -> std::io::Result<()> {
    writer.write_all(b">")?;
    writer.write_all(head)?;
    writer.write_all(b"\n")?;
    writer.write_all(seq)?;
    writer.write_all(b"\n")
}

/// A message that is sent from a [`FastaThreadReader`] to the aligner threadpool to align a chunk
/// of FASTA records.
#[derive(Debug)]
pub struct InputMessage {
    /// The FASTA records to align
    pub records: Vec<FastaOwnedRecord>,

    /// Where the records will be sent after alignment
    pub oneshot: Sender<OutputMessage>,
}

/// The output of aligning a single query: the record, and either its alignment or the reason it
/// could not be aligned.
pub type OutputResult = (FastaOwnedRecord, Result<Alignment, AlignError>);

/// The container for a chunk of alignments, one per input FASTA record.
pub struct OutputMessage {
    pub results: Vec<OutputResult>,
}

/// Groups consecutive records that share the same sequence.
pub struct FastaGroupingIterator<I: Iterator<Item = FastaOwnedRecord>>(Peekable<I>);

impl<I: Iterator<Item = FastaOwnedRecord>> FastaGroupingIterator<I> {
    pub fn new(iter: I) -> Self {
        Self(iter.peekable())
    }
}

impl<I: Iterator<Item = FastaOwnedRecord>> Iterator for FastaGroupingIterator<I> {
    type Item = Vec<FastaOwnedRecord>;

    #[inline]
    fn next(&mut self) -> Option<Vec<FastaOwnedRecord>> {
        let first = self.0.next()?;
        let mut items = vec![first];
        while let Some(record) = self.0.next_if(|record| record.seq == items[0].seq) {
            items.push(record);
        }
        Some(items)
    }
}

/// A FASTA reader that runs in its own thread and chunks records to send to a pool of aligners.
/// Records with the same sequence are never split across chunks.
pub struct FastaThreadReader {
    /// The [`JoinHandle`] for the thread that is reading.
    pub handle: JoinHandle<Result<()>>,
    /// The channel that will be receiving [`InputMessage`]s.
    pub to_align_rx: Receiver<InputMessage>,
    /// The channel that will be receiving oneshot receivers of chunks of alignments
    pub to_output_rx: Receiver<Receiver<OutputMessage>>,
}

impl FastaThreadReader {
    /// Writes the chunk of records to the alignment channel, as well as a receiver to the output
    /// channel.
    fn write_records_to_txs(
        records: Vec<FastaOwnedRecord>,
        to_align_tx: &Sender<InputMessage>,
        to_output_tx: &Sender<Receiver<OutputMessage>>,
    ) -> Result<()> {
        let (records_tx, records_rx) = flume::unbounded(); // oneshot channel
        let input_msg = InputMessage {
            records,
            oneshot: records_tx,
        };
        to_align_tx
            .send(input_msg)
            .context("Error sending records to align")?;
        to_output_tx
            .send(records_rx)
            .context("Error sending receiver")?;
        Ok(())
    }

    /// Opens the file, or standard input for `-`, unwrapping gzip when the extension says so or
    /// when `decompress` is set and the extension is not a plain FASTA one.
    fn open(file: &Path, decompress: bool) -> Result<Box<dyn Read>> {
        let raw_handle = if file.as_os_str() == "-" {
            Box::new(std::io::stdin()) as Box<dyn Read>
        } else {
            let handle = File::open(file)
                .with_context(|| format!("Error opening input: {}", file.display()))?;
            Box::new(handle) as Box<dyn Read>
        };
        let buf_handle = BufReader::with_capacity(GZ_BUFSIZE, raw_handle);
        let is_gzip = is_gzip_path(&file) || (!is_fasta_path(&file) && decompress);
        if is_gzip {
            Ok(Box::new(MultiGzDecoder::new(buf_handle)) as Box<dyn Read>)
        } else {
            Ok(Box::new(buf_handle) as Box<dyn Read>)
        }
    }

    /// Creates a new `FastaThreadReader` in a new thread.
    pub fn new(file: PathBuf, decompress: bool, threads: usize) -> Self {
        // Channel to send chunks of records to align
        let (to_align_tx, to_align_rx): (Sender<InputMessage>, Receiver<InputMessage>) =
            bounded(READER_CHANNEL_NUM_CHUNKS * threads);

        // Channel to send receivers for each aligned chunk of records. The receivers maintain the
        // order of the records.
        let (to_output_tx, to_output_rx): (
            Sender<Receiver<OutputMessage>>,
            Receiver<Receiver<OutputMessage>>,
        ) = bounded(READER_CHANNEL_NUM_CHUNKS * threads);

        let handle = std::thread::spawn(move || {
            let mut reader = FastaReader::with_capacity(Self::open(&file, decompress)?, GZ_BUFSIZE);
            let mut records: Vec<FastaOwnedRecord> =
                Vec::with_capacity(RECORDS_PER_CHUNK_PER_THREAD);
            while let Some(record) = reader.next() {
                let record = record
                    .map(|r| FastaOwnedRecord::from_fasta(&r))
                    .with_context(|| format!("Error reading FASTA: {}", file.display()))?;
                // only break a chunk between runs of identical sequences
                if records.len() >= RECORDS_PER_CHUNK_PER_THREAD
                    && records.last().map_or(true, |last| last.seq != record.seq)
                {
                    let chunk = std::mem::replace(
                        &mut records,
                        Vec::with_capacity(RECORDS_PER_CHUNK_PER_THREAD),
                    );
                    Self::write_records_to_txs(chunk, &to_align_tx, &to_output_tx)?;
                }
                records.push(record);
            }
            if !records.is_empty() {
                Self::write_records_to_txs(records, &to_align_tx, &to_output_tx)?;
            }

            Ok(())
        });
        Self {
            handle,
            to_align_rx,
            to_output_rx,
        }
    }
}
