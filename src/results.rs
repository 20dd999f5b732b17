//! The K-score result file: one tab-separated line per tested bigram,
//! `primary, left|$|right, relationship code, kscore`.
//!
//! Lines are written and flushed one at a time so an interrupted run keeps
//! every result produced before the interruption.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use log::debug;

use crate::error::{CoocError, Result};
use crate::models::{KScoreResult, PairKey, Relationship};
use crate::reader::{field, for_each_record};

pub struct ResultWriter<W: Write> {
    inner: W,
    written: usize,
}

impl ResultWriter<File> {
    /// Creates (or truncates) the result file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| CoocError::io(path, e))?;
        Ok(ResultWriter::new(file))
    }
}

impl<W: Write> ResultWriter<W> {
    pub fn new(inner: W) -> Self {
        ResultWriter { inner, written: 0 }
    }

    pub fn write(&mut self, result: &KScoreResult) -> Result<()> {
        writeln!(
            self.inner,
            "{}\t{}\t{}\t{}",
            result.primary,
            result.pair,
            result.relationship.code(),
            result.kscore
        )?;
        self.inner.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

pub fn read_results(path: &Path) -> Result<Vec<KScoreResult>> {
    debug!("Reading kscore results from {}", path.display());
    let file = File::open(path).map_err(|e| CoocError::io(path, e))?;
    parse_results(BufReader::new(file), path)
}

pub fn parse_results<R: BufRead>(reader: R, path: &Path) -> Result<Vec<KScoreResult>> {
    let mut results = Vec::new();
    for_each_record(reader, path, |line_no, line| {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            return Err(CoocError::parse(
                path,
                line_no,
                format!("expected 4 fields, found {}", fields.len()),
            ));
        }
        let pair: PairKey = fields[1]
            .parse()
            .map_err(|message: String| CoocError::parse(path, line_no, message))?;
        let code: u8 = field(&fields, 2, "relationship", path, line_no)?;
        let relationship = Relationship::from_code(code).ok_or_else(|| {
            CoocError::parse(path, line_no, format!("unknown relationship code {}", code))
        })?;
        results.push(KScoreResult {
            primary: fields[0].to_string(),
            pair,
            relationship,
            kscore: field(&fields, 3, "kscore", path, line_no)?,
        });
        Ok(())
    })?;
    Ok(results)
}

/// Attracted and repulsed bigrams of every primary token, as consumed by
/// feature extension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipSets {
    pub attractions: HashMap<String, HashSet<PairKey>>,
    pub repulsions: HashMap<String, HashSet<PairKey>>,
}

impl RelationshipSets {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a KScoreResult>,
    {
        let mut sets = RelationshipSets::default();
        for result in results {
            let target = match result.relationship {
                Relationship::Attraction => &mut sets.attractions,
                Relationship::Repulsion => &mut sets.repulsions,
                Relationship::NothingSignificant => continue,
            };
            target
                .entry(result.primary.clone())
                .or_default()
                .insert(result.pair.clone());
        }
        debug!(
            "{} primary tokens with attractions, {} with repulsions",
            sets.attractions.len(),
            sets.repulsions.len()
        );
        sets
    }

    pub fn attracted(&self, primary: &str) -> Option<&HashSet<PairKey>> {
        self.attractions.get(primary)
    }

    pub fn repulsed(&self, primary: &str) -> Option<&HashSet<PairKey>> {
        self.repulsions.get(primary)
    }
}

/// Every bigram that was tested, whatever its outcome.
pub fn distinct_pairs<'a, I>(results: I) -> HashSet<PairKey>
where
    I: IntoIterator<Item = &'a KScoreResult>,
{
    results.into_iter().map(|r| r.pair.clone()).collect()
}
