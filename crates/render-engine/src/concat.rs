//! Concat demuxer scripts.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::filter_graph::secs;

/// One `file` directive, optionally limited to `[inpoint, outpoint)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatEntry {
    pub path: PathBuf,
    pub inpoint: Option<f64>,
    pub outpoint: Option<f64>,
}

impl ConcatEntry {
    pub fn whole(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inpoint: None,
            outpoint: None,
        }
    }

    pub fn range(path: impl Into<PathBuf>, inpoint: f64, outpoint: f64) -> Self {
        Self {
            path: path.into(),
            inpoint: Some(inpoint),
            outpoint: Some(outpoint),
        }
    }
}

/// A concat demuxer script. Written verbatim to disk and passed with
/// `-f concat -safe 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConcatScript {
    pub entries: Vec<ConcatEntry>,
}

impl ConcatScript {
    pub fn new(entries: Vec<ConcatEntry>) -> Self {
        Self { entries }
    }
}

/// Single-quote a path for the concat demuxer.
pub fn quote_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

impl fmt::Display for ConcatScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "file {}", quote_path(&entry.path))?;
            if let Some(inpoint) = entry.inpoint {
                writeln!(f, "inpoint {}", secs(inpoint))?;
            }
            if let Some(outpoint) = entry.outpoint {
                writeln!(f, "outpoint {}", secs(outpoint))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_layout() {
        let script = ConcatScript::new(vec![
            ConcatEntry::whole("/intro/intro_2k.mkv"),
            ConcatEntry::range("/media/talk.mkv", 12.0, 68.0),
        ]);
        assert_eq!(
            script.to_string(),
            "file '/intro/intro_2k.mkv'\n\
             file '/media/talk.mkv'\n\
             inpoint 12.000000\n\
             outpoint 68.000000\n"
        );
    }

    #[test]
    fn test_single_quotes_are_escaped() {
        assert_eq!(
            quote_path(Path::new("/media/it's here.mkv")),
            r"'/media/it'\''s here.mkv'"
        );
    }
}
