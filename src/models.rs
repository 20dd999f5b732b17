use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::{CoocError, Result};
use crate::projection::{self, Cartesian};

/// Separator between the two tokens of a bigram in the result file. Tokens
/// must not contain it; the document reader rejects those that do.
pub const BIGRAM_SEPARATOR: &str = "|$|";

/// A geotagged short text.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tokens: Vec<String>,
    cartesian: OnceLock<Cartesian>,
}

impl Document {
    pub fn new(id: i64, lat: f64, lon: f64, tokens: Vec<String>) -> Self {
        Document {
            id,
            lat,
            lon,
            tokens,
            cartesian: OnceLock::new(),
        }
    }

    /// Projected position, computed on first use.
    pub fn cartesian(&self) -> Cartesian {
        *self
            .cartesian
            .get_or_init(|| projection::to_cartesian(self.lat, self.lon))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub id: i64,
    pub latmin: f64,
    pub lonmin: f64,
    pub latmax: f64,
    pub lonmax: f64,
}

/// The cells of the study region, south-westernmost first and
/// north-easternmost last.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<GridCell>,
}

impl Grid {
    /// Checks that the first and last cells really are the extreme corners,
    /// since the study-region bounds are read from those two cells only.
    pub fn new(cells: Vec<GridCell>) -> Result<Self> {
        let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
            return Err(CoocError::grid("grid has no cells"));
        };

        for cell in &cells {
            if !(cell.latmin <= cell.latmax && cell.lonmin <= cell.lonmax) {
                return Err(CoocError::grid(format!(
                    "cell {} has inverted bounds",
                    cell.id
                )));
            }
        }

        let latmin = cells.iter().map(|c| c.latmin).fold(f64::INFINITY, f64::min);
        let lonmin = cells.iter().map(|c| c.lonmin).fold(f64::INFINITY, f64::min);
        let latmax = cells.iter().map(|c| c.latmax).fold(f64::NEG_INFINITY, f64::max);
        let lonmax = cells.iter().map(|c| c.lonmax).fold(f64::NEG_INFINITY, f64::max);

        if first.latmin != latmin || first.lonmin != lonmin {
            return Err(CoocError::grid(format!(
                "first cell {} is not the south-west corner ({}, {}) of the grid",
                first.id, latmin, lonmin
            )));
        }
        if last.latmax != latmax || last.lonmax != lonmax {
            return Err(CoocError::grid(format!(
                "last cell {} is not the north-east corner ({}, {}) of the grid",
                last.id, latmax, lonmax
            )));
        }

        Ok(Grid { cells })
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn south_west(&self) -> (f64, f64) {
        let first = &self.cells[0];
        (first.latmin, first.lonmin)
    }

    pub fn north_east(&self) -> (f64, f64) {
        let last = &self.cells[self.cells.len() - 1];
        (last.latmax, last.lonmax)
    }
}

/// Dense ids for the distinct tokens of the training vocabulary, assigned in
/// sorted token order.
#[derive(Debug, Clone, Default)]
pub struct TokenDictionary {
    tokens: Vec<String>,
    ids: HashMap<String, usize>,
}

impl TokenDictionary {
    pub fn from_documents(documents: &[Document]) -> Self {
        let mut tokens: Vec<String> = documents
            .iter()
            .flat_map(|doc| doc.tokens.iter().cloned())
            .collect();
        tokens.sort();
        tokens.dedup();

        let ids = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();
        TokenDictionary { tokens, ids }
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.ids.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    /// Tokens in ascending order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Two adjacent tokens in the order they appeared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub left: String,
    pub right: String,
}

impl PairKey {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        PairKey {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, BIGRAM_SEPARATOR, self.right)
    }
}

impl FromStr for PairKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once(BIGRAM_SEPARATOR) {
            Some((left, right)) if !left.is_empty() && !right.is_empty() => {
                Ok(PairKey::new(left, right))
            }
            _ => Err(format!("'{}' is not a bigram key", s)),
        }
    }
}

/// A bigram, the number of documents it occurs in and those documents.
#[derive(Debug, Clone, PartialEq)]
pub struct CooccurrenceRecord {
    pub key: PairKey,
    pub count: usize,
    pub documents: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    Attraction,
    NothingSignificant,
    Repulsion,
}

impl Relationship {
    pub fn code(self) -> u8 {
        match self {
            Relationship::Attraction => 0,
            Relationship::NothingSignificant => 1,
            Relationship::Repulsion => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Relationship::Attraction),
            1 => Some(Relationship::NothingSignificant),
            2 => Some(Relationship::Repulsion),
            _ => None,
        }
    }
}

/// Outcome of testing one bigram for a primary token.
#[derive(Debug, Clone, PartialEq)]
pub struct KScoreResult {
    pub primary: String,
    pub pair: PairKey,
    pub relationship: Relationship,
    pub kscore: f64,
}

impl fmt::Display for KScoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rel: {:?}, primary: {}, pair: {}, kscore: {}",
            self.relationship, self.primary, self.pair, self.kscore
        )
    }
}

/// Totals for a finished (or interrupted) run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub tokens_analyzed: usize,
    pub pairs_tested: usize,
    pub attractions: usize,
    pub repulsions: usize,
    pub not_significant: usize,
}

impl AnalysisSummary {
    pub fn record(&mut self, relationship: Relationship) {
        self.pairs_tested += 1;
        match relationship {
            Relationship::Attraction => self.attractions += 1,
            Relationship::Repulsion => self.repulsions += 1,
            Relationship::NothingSignificant => self.not_significant += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(id: i64, latmin: f64, lonmin: f64) -> GridCell {
        GridCell {
            id,
            latmin,
            lonmin,
            latmax: latmin + 0.1,
            lonmax: lonmin + 0.1,
        }
    }

    #[test]
    fn grid_accepts_sw_to_ne_order() {
        let ne = cell(2, 40.1, 29.1);
        let grid = Grid::new(vec![cell(0, 40.0, 29.0), cell(1, 40.0, 29.1), ne]).unwrap();
        assert_eq!(grid.south_west(), (40.0, 29.0));
        assert_eq!(grid.north_east(), (ne.latmax, ne.lonmax));
        assert_eq!(grid.cells().len(), 3);
    }

    #[test]
    fn grid_rejects_unsorted_cells() {
        let result = Grid::new(vec![cell(1, 40.1, 29.1), cell(0, 40.0, 29.0)]);
        assert!(matches!(result, Err(CoocError::InvalidGrid(_))));
        assert!(Grid::new(vec![]).is_err());
    }

    #[test]
    fn dictionary_is_sorted_and_dense() {
        let docs = vec![
            Document::new(1, 0.0, 0.0, vec!["rain".into(), "city".into()]),
            Document::new(2, 0.0, 0.0, vec!["umbrella".into(), "rain".into()]),
        ];
        let dict = TokenDictionary::from_documents(&docs);
        assert_eq!(dict.tokens(), &["city", "rain", "umbrella"]);
        assert_eq!(dict.id("rain"), Some(1));
        assert_eq!(dict.token(2), Some("umbrella"));
        assert_eq!(dict.id("snow"), None);
    }

    #[test]
    fn pair_key_text_form() {
        let key = PairKey::new("rain", "umbrella");
        assert_eq!(key.to_string(), "rain|$|umbrella");
        assert_eq!("rain|$|umbrella".parse::<PairKey>().unwrap(), key);
        assert!("rain umbrella".parse::<PairKey>().is_err());
    }

    #[test]
    fn summary_serializes_its_counts() {
        let mut summary = AnalysisSummary::default();
        summary.record(Relationship::Attraction);
        summary.record(Relationship::NothingSignificant);
        summary.tokens_analyzed = 1;

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["tokens_analyzed"], 1);
        assert_eq!(json["pairs_tested"], 2);
        assert_eq!(json["attractions"], 1);
        assert_eq!(json["repulsions"], 0);
        assert_eq!(json["not_significant"], 1);
    }

    #[test]
    fn relationship_codes() {
        for rel in [Relationship::Attraction, Relationship::NothingSignificant, Relationship::Repulsion] {
            assert_eq!(Relationship::from_code(rel.code()), Some(rel));
        }
        assert_eq!(Relationship::from_code(3), None);
    }
}
