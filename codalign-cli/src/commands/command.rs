use anyhow::Result;
use clap::builder::PossibleValue;
use enum_dispatch::enum_dispatch;
use std::{fmt::Display, str::FromStr};

#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self) -> Result<()>;
}

/// Option values parsed from their display names, each with a line of help.
pub trait ValueEnum: Display + FromStr {
    fn variants<'a>() -> &'a [Self];

    /// One line describing the value in `--help`.
    fn help(&self) -> Option<&'static str> {
        None
    }

    fn possible_values() -> Vec<PossibleValue> {
        Self::variants()
            .iter()
            .map(|variant| PossibleValue::new(variant.to_string()).help(variant.help()))
            .collect()
    }
}
