//! Engine configuration surface.
//!
//! `RECORD_SIZE`, `PAGE_SIZE`, and `RECORDS_PER_PAGE` stay compile-time
//! constants (`crate::record`): they are part of the on-disk format,
//! and changing them at runtime would produce a different,
//! incompatible engine. What does vary between a production open and
//! a test open is where the journal lives.

use std::path::{Path, PathBuf};

pub struct EngineConfig {
    pub data_path: PathBuf,
    pub journal_path: PathBuf,
}

impl EngineConfig {
    /// Default layout: journal path is the data path with `.log`
    /// appended.
    pub fn new<P: AsRef<Path>>(data_path: P) -> Self {
        let data_path = data_path.as_ref().to_path_buf();
        let mut journal_os_string = data_path.clone().into_os_string();
        journal_os_string.push(".log");
        Self {
            journal_path: PathBuf::from(journal_os_string),
            data_path,
        }
    }

    pub fn with_journal_path<P: AsRef<Path>>(mut self, journal_path: P) -> Self {
        self.journal_path = journal_path.as_ref().to_path_buf();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_journal_path_appends_log_suffix() {
        let config = EngineConfig::new("/tmp/foo.db");
        assert_eq!(config.journal_path, PathBuf::from("/tmp/foo.db.log"));
    }

    #[test]
    fn journal_path_can_be_overridden() {
        let config = EngineConfig::new("/tmp/foo.db").with_journal_path("/tmp/bar.log");
        assert_eq!(config.journal_path, PathBuf::from("/tmp/bar.log"));
    }
}
