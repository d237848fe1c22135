//! Transcript ingestion
//!
//! Finds transcripts in a directory, parses each one completely and commits
//! the parsed blocks to the store inside one transaction per transcript.
//! Files are processed in natural filename order (`2 B.log` before `10 A.log`).

pub mod commit;

pub use commit::{CommitStats, Committer};

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::parser::{parse_transcript, Diagnostics, ParseOptions};
use crate::storage::{LogFileRecord, SqliteStore};
use crate::{Error, Result};

/// Outcome of ingesting one transcript
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TranscriptOutcome {
    pub filename: String,
    pub site: String,
    pub hostname: Option<String>,
    pub line_count: usize,
    pub commit: CommitStats,
    pub diagnostics: Diagnostics,
}

/// Totals over a batch of transcripts
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IngestStats {
    pub files: usize,
    pub appliances: usize,
    /// Transcripts without a hostname; their device entities were skipped
    pub without_hostname: usize,
    pub unreadable: usize,
    pub commit: CommitStats,
    pub diagnostics: Diagnostics,
}

impl IngestStats {
    pub fn add(&mut self, outcome: &TranscriptOutcome) {
        self.files += 1;
        if outcome.hostname.is_some() {
            self.appliances += 1;
        } else {
            self.without_hostname += 1;
        }
        self.commit.merge(&outcome.commit);
        self.diagnostics.merge(&outcome.diagnostics);
    }
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Ingest Statistics:")?;
        writeln!(f, "  Transcripts: {}", self.files)?;
        writeln!(f, "  Appliances: {}", self.appliances)?;
        if self.without_hostname > 0 {
            writeln!(f, "  Without hostname: {}", self.without_hostname)?;
        }
        if self.unreadable > 0 {
            writeln!(f, "  Unreadable: {}", self.unreadable)?;
        }
        write!(f, "{}", self.commit)?;
        writeln!(f, "  Ignored lines: {}", self.diagnostics.ignored_lines)?;
        writeln!(f, "  Unparseable lines: {}", self.diagnostics.unparseable_lines)?;
        writeln!(f, "  Contradictions: {}", self.diagnostics.contradictions)?;
        writeln!(f, "  Discarded route targets: {}", self.diagnostics.discarded_route_targets)
    }
}

/// Drives parsing and committing of transcripts into a store
pub struct Ingestor<'a> {
    store: &'a mut SqliteStore,
    options: ParseOptions,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a mut SqliteStore, options: ParseOptions) -> Self {
        Self { store, options }
    }

    /// Ingest every transcript with the given extension under `dir`
    pub fn ingest_dir(&mut self, dir: &Path, extension: &str) -> Result<IngestStats> {
        let files = discover(dir, extension)?;
        info!(count = files.len(), dir = %dir.display(), "Discovered transcripts");

        let mut stats = IngestStats::default();
        for path in &files {
            match self.ingest_file(path) {
                Ok(outcome) => stats.add(&outcome),
                Err(Error::Io(e)) => {
                    warn!(file = %path.display(), error = %e, "Skipping unreadable transcript");
                    stats.unreadable += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(stats)
    }

    /// Read, fingerprint and ingest one transcript file
    pub fn ingest_file(&mut self, path: &Path) -> Result<TranscriptOutcome> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let hash = blake3::hash(&bytes).to_hex().to_string();
        self.ingest_text(&filename, &text, hash)
    }

    /// Ingest transcript text already in memory
    pub fn ingest_transcript(&mut self, filename: &str, text: &str) -> Result<TranscriptOutcome> {
        let hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        self.ingest_text(filename, text, hash)
    }

    fn ingest_text(&mut self, filename: &str, text: &str, hash: String) -> Result<TranscriptOutcome> {
        let parsed = parse_transcript(text, filename, &self.options);
        let (site, importance) = site_from_filename(filename);
        debug!(filename, site = %site, blocks = parsed.blocks.len(), "Parsed transcript");

        self.store.begin_transaction()?;
        match self.commit_parsed(filename, &site, importance, hash, &parsed) {
            Ok(commit) => {
                self.store.commit()?;
                Ok(TranscriptOutcome {
                    filename: filename.to_string(),
                    site,
                    hostname: parsed.hostname,
                    line_count: parsed.line_count,
                    commit,
                    diagnostics: parsed.diagnostics,
                })
            }
            Err(e) => {
                self.store.rollback()?;
                Err(e)
            }
        }
    }

    fn commit_parsed(
        &self,
        filename: &str,
        site: &str,
        importance: i64,
        hash: String,
        parsed: &crate::parser::ParsedTranscript,
    ) -> Result<CommitStats> {
        let site_id = self.store.insert_site(site, importance)?;

        let Some(hostname) = parsed.hostname.as_deref() else {
            warn!(filename, "No hostname found; device entities skipped");
            self.store.insert_log_file(&LogFileRecord {
                filename: filename.to_string(),
                hash,
                line_count: parsed.line_count,
                site_id,
                app_id: None,
            })?;
            return Ok(CommitStats::default());
        };

        let app_id = self.store.insert_appliance(hostname, site_id)?;
        self.store.insert_log_file(&LogFileRecord {
            filename: filename.to_string(),
            hash,
            line_count: parsed.line_count,
            site_id,
            app_id: Some(app_id),
        })?;

        let mut committer = Committer::new(&*self.store, app_id, filename);
        for block in &parsed.blocks {
            committer.commit_block(block)?;
        }
        Ok(committer.finish())
    }
}

/// Transcripts under `dir` with the given extension, in natural order
pub fn discover(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.');
    let dir_str = dir
        .to_str()
        .ok_or_else(|| Error::Config(format!("Non UTF-8 path: {}", dir.display())))?;
    let pattern = format!("{}/*.{}", glob::Pattern::escape(dir_str), extension);

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| Error::Config(format!("Invalid transcript pattern {}: {}", pattern, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();

    files.sort_by(|a, b| {
        let a = a.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let b = b.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        natural_cmp(&a, &b)
    });
    Ok(files)
}

/// Site name and importance from a transcript filename.
///
/// `12 Branch Office.log` is site `Branch Office` with importance 12; a
/// filename without a leading number has importance 0.
pub fn site_from_filename(filename: &str) -> (String, i64) {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());
    let stem = stem.trim_start();

    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    let importance = digits.parse().unwrap_or(0);
    let name = stem[digits.len()..].trim();
    if name.is_empty() {
        (stem.trim().to_string(), importance)
    } else {
        (name.to_string(), importance)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Number(u128),
    Text(String),
}

fn chunks(name: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut chars = name.chars().peekable();
    while let Some(&c) = chars.peek() {
        let digit = c.is_ascii_digit();
        let mut run = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() != digit {
                break;
            }
            run.push(c);
            chars.next();
        }
        out.push(match run.parse() {
            Ok(n) if digit => Chunk::Number(n),
            _ => Chunk::Text(run.to_lowercase()),
        });
    }
    out
}

/// Numeric-aware, case-insensitive filename comparison
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    chunks(a).cmp(&chunks(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_from_filename() {
        assert_eq!(site_from_filename("12 Branch Office.log"), ("Branch Office".to_string(), 12));
        assert_eq!(site_from_filename("HQ.log"), ("HQ".to_string(), 0));
        assert_eq!(site_from_filename("7.log"), ("7".to_string(), 7));
    }

    #[test]
    fn test_natural_order() {
        let mut names = vec!["10 A.log", "2 B.log", "1 c.log", "b.log", "A.log"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["1 c.log", "2 B.log", "10 A.log", "A.log", "b.log"]);
    }

    #[test]
    fn test_missing_hostname_skips_device_entities() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut ingestor = Ingestor::new(&mut store, ParseOptions::default());
        let outcome = ingestor
            .ingest_transcript("3 Depot.log", "interface Loopback0\n ip address 10.0.0.1 255.255.255.255\n")
            .unwrap();
        assert_eq!(outcome.hostname, None);

        let stats = store.stats().unwrap();
        assert_eq!(stats.sites, 1);
        assert_eq!(stats.transcripts, 1);
        assert_eq!(stats.appliances, 0);
        assert_eq!(stats.interfaces, 0);
    }

    #[test]
    fn test_transcripts_of_one_site_share_it() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let mut ingestor = Ingestor::new(&mut store, ParseOptions::default());
            ingestor.ingest_transcript("4 Hub.log", "HUB1#show run\nhostname HUB1\n").unwrap();
            ingestor.ingest_transcript("Hub.log", "HUB2#show run\nhostname HUB2\n").unwrap();
        }

        let stats = store.stats().unwrap();
        assert_eq!(stats.sites, 1);
        assert_eq!(stats.transcripts, 2);
        let appliances = store.appliances().unwrap();
        assert_eq!(appliances.len(), 2);
        // The first transcript fixes the importance
        assert!(appliances.iter().all(|a| a.site == "Hub" && a.importance == 4));
    }

    #[test]
    fn test_ingest_dir_in_natural_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("10 Core.log"), "CORE1#show run\nhostname CORE1\n").unwrap();
        std::fs::write(dir.join("2 Edge.log"), "\u{feff}EDGE1#show run\nhostname EDGE1\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "R9#show run\n").unwrap();

        let found = discover(&dir, ".log").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["2 Edge.log", "10 Core.log"]);

        let mut store = SqliteStore::open_in_memory().unwrap();
        let stats = Ingestor::new(&mut store, ParseOptions::default())
            .ingest_dir(&dir, "log")
            .unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.appliances, 2);

        let appliances = store.appliances().unwrap();
        assert_eq!(appliances[0].site, "Edge");
        assert_eq!(appliances[0].importance, 2);
    }
}
