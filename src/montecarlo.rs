//! Monte Carlo envelope test for one bigram.
//!
//! ## Procedure
//!
//! 1. Compute K for the documents where the bigram occurs.
//! 2. Seed ChaCha8 with `|primary| * |cooccurring|`, so equally sized inputs
//!    always see the same draws regardless of token, run order or clock.
//! 3. Draw `simulation_count` samples of `|cooccurring|` documents from the
//!    primary token's documents without replacement (partial Fisher-Yates)
//!    and compute K for each.
//! 4. Compare the observed K with the envelope formed by the `m`-th highest
//!    and `m`-th lowest simulated values, `m = floor(range * count)`.
//!
//! ## Reproducibility
//!
//! Index samples are drawn sequentially from the single seeded generator in
//! fixed-size batches, and each batch is evaluated before the next one is
//! drawn. Draw order does not depend on the batch size or on the thread
//! count, so the K evaluations may run on the rayon pool without changing a
//! single bit of output, and at most one batch of samples is held at a time.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::error::{CoocError, Result};
use crate::kfunction::KFunction;
use crate::models::Relationship;
use crate::projection::Cartesian;

/// Critical values taken from the sorted simulated K scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub upper: f64,
    pub lower: f64,
}

impl Envelope {
    /// `m` is the number of simulations on each tail.
    pub fn from_simulations(mut simulated: Vec<f64>, m: usize) -> Result<Self> {
        if m == 0 || m > simulated.len() {
            return Err(CoocError::config(format!(
                "envelope size {} does not fit {} simulations",
                m,
                simulated.len()
            )));
        }
        simulated.sort_by(|a, b| b.total_cmp(a));
        Ok(Envelope {
            upper: simulated[m - 1],
            lower: simulated[simulated.len() - m],
        })
    }

    pub fn classify(&self, observed: f64) -> Relationship {
        if observed < self.lower {
            Relationship::Repulsion
        } else if observed > self.upper {
            Relationship::Attraction
        } else {
            Relationship::NothingSignificant
        }
    }
}

/// Outcome of one envelope test.
#[derive(Debug, Clone, PartialEq)]
pub struct Significance {
    pub relationship: Relationship,
    pub observed: f64,
    pub envelope: Envelope,
}

pub struct MonteCarloTester<'a> {
    kfunction: KFunction<'a>,
    simulation_count: usize,
    envelope_size: usize,
    parallel: bool,
    batch_size: usize,
}

impl<'a> MonteCarloTester<'a> {
    pub fn new(kfunction: KFunction<'a>, config: &AnalysisConfig) -> Self {
        MonteCarloTester {
            kfunction,
            simulation_count: config.simulation_count,
            envelope_size: config.envelope_size(),
            parallel: config.parallel,
            batch_size: default_batch_size(),
        }
    }

    /// Number of samples drawn and evaluated together.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Tests whether `cooccurring` is more clustered or more dispersed than
    /// equally sized random subsets of `primary`.
    pub fn classify(&self, primary: &[Cartesian], cooccurring: &[Cartesian]) -> Result<Significance> {
        if cooccurring.len() > primary.len() {
            return Err(CoocError::config(format!(
                "cannot draw {} points from {}",
                cooccurring.len(),
                primary.len()
            )));
        }

        let observed = self.kfunction.compute(cooccurring);
        if cooccurring.len() < 2 {
            // every simulated draw would be degenerate too
            let envelope = Envelope {
                upper: 0.0,
                lower: 0.0,
            };
            return Ok(Significance {
                relationship: envelope.classify(observed),
                observed,
                envelope,
            });
        }

        let mut stream = SampleStream::new(
            simulation_seed(primary.len(), cooccurring.len()),
            primary.len(),
            cooccurring.len(),
        );
        let simulate = |indices: &Vec<usize>| {
            let points: Vec<Cartesian> = indices.iter().map(|&i| primary[i]).collect();
            self.kfunction.compute(&points)
        };

        let mut simulated = Vec::with_capacity(self.simulation_count);
        while simulated.len() < self.simulation_count {
            let wanted = self.batch_size.min(self.simulation_count - simulated.len());
            let batch = stream.next_batch(wanted);
            if self.parallel {
                simulated.par_extend(batch.par_iter().map(simulate));
            } else {
                simulated.extend(batch.iter().map(simulate));
            }
        }

        let envelope = Envelope::from_simulations(simulated, self.envelope_size)?;
        Ok(Significance {
            relationship: envelope.classify(observed),
            observed,
            envelope,
        })
    }
}

/// Seed for a test with the given sample sizes.
pub fn simulation_seed(primary_len: usize, cooccurring_len: usize) -> u64 {
    (primary_len as u64).wrapping_mul(cooccurring_len as u64)
}

fn default_batch_size() -> usize {
    (rayon::current_num_threads() * 4).max(1)
}

/// The seeded sequence of index samples for one test.
struct SampleStream {
    rng: ChaCha8Rng,
    pool: Vec<usize>,
    size: usize,
}

impl SampleStream {
    fn new(seed: u64, population: usize, size: usize) -> Self {
        SampleStream {
            rng: ChaCha8Rng::seed_from_u64(seed),
            pool: (0..population).collect(),
            size,
        }
    }

    fn next_batch(&mut self, count: usize) -> Vec<Vec<usize>> {
        (0..count)
            .map(|_| sample_without_replacement(&mut self.rng, &mut self.pool, self.size))
            .collect()
    }
}

/// Partial Fisher-Yates: the first `size` slots of `pool` after `size`
/// swap steps are a uniform sample. `pool` is left permuted and reused as
/// the starting order of the next draw.
pub fn sample_without_replacement<R: Rng>(rng: &mut R, pool: &mut [usize], size: usize) -> Vec<usize> {
    let n = pool.len();
    let size = size.min(n);
    for i in 0..size {
        let j = rng.gen_range(i..n);
        pool.swap(i, j);
    }
    pool[..size].to_vec()
}
