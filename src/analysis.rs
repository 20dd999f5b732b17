use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::AnalysisConfig;
use crate::cooccurrence::{ordered_cooccurrences, CooccurrenceIndex};
use crate::error::{CoocError, Result};
use crate::geometry::StudyRegion;
use crate::kfunction::KFunction;
use crate::models::{AnalysisSummary, Document, Grid, KScoreResult, TokenDictionary};
use crate::montecarlo::MonteCarloTester;
use crate::projection::{self, Cartesian, BEARING_NORTH};
use crate::results::ResultWriter;

/// Shared flag that asks a running analysis to stop after the current pair.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Finds attraction/repulsion bigrams for every token of a training corpus.
pub struct AnalysisDriver<'a> {
    config: &'a AnalysisConfig,
    documents: &'a [Document],
    dictionary: TokenDictionary,
    index: CooccurrenceIndex,
    region: StudyRegion,
    area: f64,
    radius: f64,
}

impl<'a> AnalysisDriver<'a> {
    /// Builds the vocabulary, membership index and run-wide geometry.
    ///
    /// The search radius is the chord length of `delta_distance_km` measured
    /// northwards from the first document, and is reused for every pair.
    pub fn new(config: &'a AnalysisConfig, grid: &Grid, documents: &'a [Document]) -> Result<Self> {
        config.validate()?;
        let first = documents.first().ok_or(CoocError::EmptyCorpus)?;

        let dictionary = TokenDictionary::from_documents(documents);
        let index = CooccurrenceIndex::build(&dictionary, documents);
        let region = StudyRegion::from_grid(grid);
        let area = region.area();
        let radius = projection::chord_length_for_distance(
            first.lat,
            first.lon,
            BEARING_NORTH,
            config.delta_distance_km,
        );

        info!(
            "Prepared {} documents, {} distinct tokens, {} memberships; area {:.3} km², radius {:.6}",
            documents.len(),
            dictionary.len(),
            index.entries(),
            area,
            radius
        );

        Ok(AnalysisDriver {
            config,
            documents,
            dictionary,
            index,
            region,
            area,
            radius,
        })
    }

    pub fn dictionary(&self) -> &TokenDictionary {
        &self.dictionary
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Analyzes every token in sorted order, handing each result to `emit`
    /// as soon as it is known.
    pub fn run_with<F>(&self, cancel: &CancellationToken, mut emit: F) -> Result<AnalysisSummary>
    where
        F: FnMut(KScoreResult) -> Result<()>,
    {
        info!(
            "Starting attraction/repulsion analysis: delta {} km, {} simulations, min frequency {}",
            self.config.delta_distance_km, self.config.simulation_count, self.config.min_term_frequency
        );
        let started = Instant::now();
        let deadline = self.config.max_runtime_secs.map(Duration::from_secs);
        let total = self.dictionary.len();
        let mut summary = AnalysisSummary::default();

        for (position, primary) in self.dictionary.tokens().iter().enumerate() {
            debug!("Analyzing relationships for {} ({}/{})", primary, position + 1, total);
            self.check_interrupt(cancel, started, deadline, summary.pairs_tested)?;

            self.analyze_token_with(primary, |result| {
                summary.record(result.relationship);
                emit(result)?;
                self.check_interrupt(cancel, started, deadline, summary.pairs_tested)
            })?;
            summary.tokens_analyzed += 1;
        }

        info!(
            "Finished in {:.1}s: {} pairs over {} tokens, {} attractions, {} repulsions",
            started.elapsed().as_secs_f64(),
            summary.pairs_tested,
            summary.tokens_analyzed,
            summary.attractions,
            summary.repulsions
        );
        Ok(summary)
    }

    /// Like [`run_with`](Self::run_with), appending each result to `writer`.
    pub fn run<W: Write>(&self, writer: &mut ResultWriter<W>, cancel: &CancellationToken) -> Result<AnalysisSummary> {
        self.run_with(cancel, |result| writer.write(&result))
    }

    /// Tests every sufficiently frequent bigram of `primary`.
    pub fn analyze_token(&self, primary: &str) -> Result<Vec<KScoreResult>> {
        let mut results = Vec::new();
        self.analyze_token_with(primary, |result| {
            results.push(result);
            Ok(())
        })?;
        Ok(results)
    }

    /// Tests the bigrams of `primary` in descending frequency, passing each
    /// result to `on_result` before the next pair is started.
    pub fn analyze_token_with<F>(&self, primary: &str, mut on_result: F) -> Result<()>
    where
        F: FnMut(KScoreResult) -> Result<()>,
    {
        let token_id = self
            .dictionary
            .id(primary)
            .ok_or_else(|| CoocError::UnknownToken(primary.to_string()))?;
        let ordinals = self.index.documents_containing(token_id);
        let primary_points = self.points(ordinals);

        let kfunction = KFunction::new(&self.region, self.radius, self.area, self.config.edge_correction);
        let tester = MonteCarloTester::new(kfunction, self.config);

        let cooccurrences = ordered_cooccurrences(primary, self.documents, ordinals);
        for record in cooccurrences.by_descending_frequency() {
            // sorted by count, so nothing after this qualifies either
            if record.count < self.config.min_term_frequency {
                break;
            }
            debug!(
                "Analyzing {} (freq: {}) and {} (freq: {})",
                primary,
                ordinals.len(),
                record.key,
                record.count
            );

            let significance = tester.classify(&primary_points, &self.points(&record.documents))?;
            let result = KScoreResult {
                primary: primary.to_string(),
                pair: record.key,
                relationship: significance.relationship,
                kscore: significance.observed,
            };
            debug!("{}", result);
            on_result(result)?;
        }
        Ok(())
    }

    fn points(&self, ordinals: &[usize]) -> Vec<Cartesian> {
        ordinals.iter().map(|&i| self.documents[i].cartesian()).collect()
    }

    fn check_interrupt(
        &self,
        cancel: &CancellationToken,
        started: Instant,
        deadline: Option<Duration>,
        results: usize,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(CoocError::Cancelled(results));
        }
        if let Some(limit) = deadline {
            if started.elapsed() >= limit {
                return Err(CoocError::DeadlineExceeded {
                    secs: limit.as_secs(),
                    results,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GridCell;
    use approx::assert_abs_diff_eq;

    fn grid() -> Grid {
        Grid::new(vec![GridCell {
            id: 0,
            latmin: 40.0,
            lonmin: 29.0,
            latmax: 41.0,
            lonmax: 30.0,
        }])
        .unwrap()
    }

    fn doc(lat: f64, lon: f64, tokens: &str) -> Document {
        Document::new(0, lat, lon, tokens.split_whitespace().map(str::to_string).collect())
    }

    #[test]
    fn radius_comes_from_first_document() {
        let config = AnalysisConfig::default();
        let documents = vec![doc(40.5, 29.5, "a b"), doc(40.9, 29.9, "b")];
        let driver = AnalysisDriver::new(&config, &grid(), &documents).unwrap();

        let expected = projection::chord_length_for_distance(40.5, 29.5, BEARING_NORTH, 0.5);
        assert_eq!(driver.radius(), expected);
        assert_abs_diff_eq!(driver.area(), StudyRegion::from_grid(&grid()).area(), epsilon = 1e-9);
        assert_eq!(driver.dictionary().tokens(), &["a", "b"]);
    }

    #[test]
    fn unknown_token_is_an_error() {
        let config = AnalysisConfig::default();
        let documents = vec![doc(40.5, 29.5, "a b")];
        let driver = AnalysisDriver::new(&config, &grid(), &documents).unwrap();
        assert!(matches!(driver.analyze_token("zzz"), Err(CoocError::UnknownToken(_))));
    }

    #[test]
    fn rare_pairs_are_skipped() {
        let config = AnalysisConfig::default();
        let documents: Vec<Document> = (0..4).map(|i| doc(40.5 + 0.01 * i as f64, 29.5, "a b")).collect();
        let driver = AnalysisDriver::new(&config, &grid(), &documents).unwrap();
        assert!(driver.analyze_token("a").unwrap().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AnalysisConfig {
            simulation_count: 0,
            ..AnalysisConfig::default()
        };
        let documents = vec![doc(40.5, 29.5, "a b")];
        assert!(matches!(
            AnalysisDriver::new(&config, &grid(), &documents),
            Err(CoocError::Config(_))
        ));
    }
}
