//! The repository of known host keys, persisted in the OpenSSH
//! `known_hosts` text format.

use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{interact::Interaction, Error, Result};

mod record;
pub use record::{KeyKind, Record};

/// The disposition of a host key against the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// The key is on record for this host.
    Ok,

    /// A key of the same type is on record for this host,
    /// with different bytes.
    Changed,

    /// No key of this type is on record for this host.
    NotIncluded,
}

/// A repository of host keys shared across sessions; implementations
/// serialise their mutations internally.
pub trait KnownHosts: Send + Sync {
    /// The disposition of `key`, a raw host key blob, for `host`.
    ///
    /// A `[host]:port` query that matches nothing is retried with the
    /// brackets and port stripped.
    fn check(&self, host: &str, key: &[u8]) -> Check;

    /// Add a record, persisting it synchronously.
    ///
    /// The `interaction` handle is consulted before touching the
    /// filesystem beyond the repository itself, such as creating its
    /// missing parent directory; without a handle such operations fail.
    fn add(&self, record: Record, interaction: Option<&dyn Interaction>) -> Result<()>;

    /// Remove the records matching `host`, and optionally only those
    /// of a given type or exact key.
    fn remove(&self, host: &str, kind: Option<&KeyKind>, key: Option<&[u8]>) -> Result<()>;

    /// The records matching `host` and `kind`, unfiltered when `None`.
    fn host_keys(&self, host: Option<&str>, kind: Option<&KeyKind>) -> Vec<Record>;

    /// The persistent identifier of the backing store, e.g. its path.
    fn repository_id(&self) -> String;
}

/// Strip the `[host]:port` bracket form down to the bare host.
fn strip_brackets(host: &str) -> Option<&str> {
    host.strip_prefix('[')?.split_once("]:").map(|(host, _)| host)
}

fn check_records(records: &[Record], host: &str, key: &[u8]) -> Check {
    let kind = KeyKind::from_blob(key);
    let mut changed = false;

    for record in records {
        if *record.kind() == kind && record.matches_host(host) {
            if record.key() == key {
                return Check::Ok;
            }

            changed = true;
        }
    }

    if changed {
        Check::Changed
    } else {
        Check::NotIncluded
    }
}

/// A [`KnownHosts`] repository backed by an OpenSSH-format file,
/// loaded eagerly and rewritten in full on every mutation.
pub struct FileKnownHosts {
    path: PathBuf,
    records: Mutex<Vec<Record>>,
}

impl FileKnownHosts {
    /// Open the repository at `path`; a missing file is an empty
    /// repository, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = match std::fs::File::open(&path) {
            Ok(file) => Self::load(std::io::BufReader::new(file))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(
            "Loaded {} host keys from `{}`",
            records.len(),
            path.display()
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Parse records from any byte stream in the `known_hosts` format;
    /// lines containing `#` and lines that do not parse are skipped.
    pub fn load(reader: impl BufRead) -> Result<Vec<Record>> {
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;

            if line.trim().is_empty() || line.contains('#') {
                continue;
            }

            match Record::parse_line(&line) {
                Some(record) => records.push(record),
                None => tracing::warn!("Skipped a malformed known_hosts line"),
            }
        }

        Ok(records)
    }

    fn store(path: &Path, records: &[Record]) -> Result<()> {
        let mut file = std::fs::File::create(path)?;

        for record in records {
            writeln!(file, "{}", record.to_line())?;
        }

        file.sync_all()?;

        Ok(())
    }
}

impl KnownHosts for FileKnownHosts {
    fn check(&self, host: &str, key: &[u8]) -> Check {
        let records = self
            .records
            .lock()
            .expect("The known-hosts lock is poisoned");

        match check_records(&records, host, key) {
            Check::NotIncluded => match strip_brackets(host) {
                Some(stripped) => check_records(&records, stripped, key),
                None => Check::NotIncluded,
            },
            disposition => disposition,
        }
    }

    fn add(&self, record: Record, interaction: Option<&dyn Interaction>) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .expect("The known-hosts lock is poisoned");

        if let Some(directory) = self.path.parent() {
            if !directory.as_os_str().is_empty() && !directory.exists() {
                let prompt = format!(
                    "The directory `{}` does not exist, create it?",
                    directory.display()
                );

                match interaction {
                    Some(interaction) if interaction.prompt_yes_no(&prompt) => {
                        std::fs::create_dir_all(directory)?;
                    }
                    _ => return Err(Error::Cancelled),
                }
            }
        }

        records.push(record);

        Self::store(&self.path, &records)
    }

    fn remove(&self, host: &str, kind: Option<&KeyKind>, key: Option<&[u8]>) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .expect("The known-hosts lock is poisoned");

        records.retain(|record| {
            !(record.matches_host(host)
                && kind.map_or(true, |kind| record.kind() == kind)
                && key.map_or(true, |key| record.key() == key))
        });

        Self::store(&self.path, &records)
    }

    fn host_keys(&self, host: Option<&str>, kind: Option<&KeyKind>) -> Vec<Record> {
        self.records
            .lock()
            .expect("The known-hosts lock is poisoned")
            .iter()
            .filter(|record| host.map_or(true, |host| record.matches_host(host)))
            .filter(|record| kind.map_or(true, |kind| record.kind() == kind))
            .cloned()
            .collect()
    }

    fn repository_id(&self) -> String {
        self.path.display().to_string()
    }
}
