use anyhow::{anyhow, bail, Context, Result};
use fgoxide::io::Io;
use std::{collections::HashMap, fmt::Display, io::BufRead, path::Path, str::FromStr};

/// 64 KB buffer used when reading settings files.
const BUFFER_SIZE: usize = 64 * 1024;

/// Settings read from an INI-like file, e.g. a scoring model:
///
/// ```text
/// ; nucleotide scoring
/// [ALPHABET]
/// alphabet = ACGT
/// [MATRIX]
/// cost = 5, -4, ...
/// ```
///
/// All whitespace is removed from every line before it is interpreted, lines starting with `;`
/// are comments, and every `key=value,...` line is stored under the most recent `[section]`.  When
/// a key is repeated within a section, the first definition is kept.
#[derive(Clone, Debug, Default)]
pub struct ConfigFile {
    entries: HashMap<(String, String), Vec<String>>,
}

impl ConfigFile {
    /// Reads settings from a (possibly gzipped) file.
    pub fn from_path<P: AsRef<Path>>(path: &P) -> Result<Self> {
        let fg_io: Io = Io::new(5, BUFFER_SIZE);
        let reader = fg_io
            .new_reader(path)
            .with_context(|| format!("Error opening settings file: {}", path.as_ref().display()))?;
        Self::from_reader(reader)
            .with_context(|| format!("Error parsing settings file: {}", path.as_ref().display()))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries: HashMap<(String, String), Vec<String>> = HashMap::new();
        let mut section = String::new();
        for (index, line) in reader.lines().enumerate() {
            let line: String = line?.chars().filter(|c| !c.is_whitespace()).collect();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.to_string();
                continue;
            }
            match line.split_once('=') {
                Some((key, values)) => {
                    let values = values.split(',').map(str::to_string).collect();
                    entries
                        .entry((section.clone(), key.to_string()))
                        .or_insert(values);
                }
                None => bail!("line {}: parsing error: {}", index + 1, line),
            }
        }
        Ok(Self { entries })
    }

    /// True if the section contains the key.
    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.entries
            .contains_key(&(section.to_string(), key.to_string()))
    }

    fn values(&self, section: &str, key: &str) -> Result<&[String]> {
        self.entries
            .get(&(section.to_string(), key.to_string()))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                anyhow!(
                    "Could not find required configuration section {} key {}",
                    section,
                    key
                )
            })
    }

    /// Returns the first value of the key, parsed as `T`.
    pub fn get<T>(&self, section: &str, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let values = self.values(section, key)?;
        let value = values.first().map_or("", String::as_str);
        value
            .parse::<T>()
            .map_err(|e| anyhow!("Could not parse {}:{} value '{}': {}", section, key, value, e))
    }

    /// Returns every comma-separated value of the key, each parsed as `T`.
    pub fn get_vec<T>(&self, section: &str, key: &str) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.values(section, key)?
            .iter()
            .map(|value| {
                value.parse::<T>().map_err(|e| {
                    anyhow!("Could not parse {}:{} value '{}': {}", section, key, value, e)
                })
            })
            .collect()
    }
}
