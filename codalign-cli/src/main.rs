pub mod commands;

use anyhow::Result;
use clap::Parser;
use codalign::util::version::built_info;
use commands::{align::Align, command::Command};
use enum_dispatch::enum_dispatch;
use env_logger::Env;

/// Nucleotide, protein and codon-aware alignment of queries to a reference.
#[derive(Parser, Debug)]
#[clap(name = "codalign", version = built_info::VERSION.as_str())]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[enum_dispatch(Command)]
#[derive(Parser, Debug)]
enum Subcommand {
    /// Align each query in a FASTA file to a reference sequence
    Align(Align),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
    Args::parse().subcommand.execute()
}
