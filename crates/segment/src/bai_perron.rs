use common::{BreakCount, BreakError, Result, SegmentConfig};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::rss::RssTable;
use crate::{bic, min_segment_size, SegmentationStrategy};

/// Optimal partition by dynamic programming over the RSS of all admissible
/// segments (Bai & Perron, 2003), with the break count chosen by BIC unless
/// fixed.
#[derive(Debug, Clone)]
pub struct BaiPerron {
    min_segment_fraction: f64,
    max_breaks: Option<usize>,
    break_count: BreakCount,
}

impl BaiPerron {
    pub fn new(min_segment_fraction: f64) -> Self {
        Self {
            min_segment_fraction,
            max_breaks: None,
            break_count: BreakCount::Auto,
        }
    }

    pub fn with_max_breaks(mut self, max_breaks: usize) -> Self {
        self.max_breaks = Some(max_breaks);
        self
    }

    pub fn with_break_count(mut self, break_count: BreakCount) -> Self {
        self.break_count = break_count;
        self
    }

    pub fn from_config(config: &SegmentConfig) -> Self {
        Self {
            min_segment_fraction: config.min_segment_fraction,
            max_breaks: config.max_breaks,
            break_count: config.break_count,
        }
    }
}

impl Default for BaiPerron {
    fn default() -> Self {
        Self::new(0.15)
    }
}

/// Optimal break ends for every break count up to `max_m`.
struct Partitions {
    /// `cost[m][j]`: least RSS of rows `0..=j` split into `m + 1` segments.
    cost: Vec<Vec<f64>>,
    /// `last[m][j]`: end row of the `m`-th segment in that optimum.
    last: Vec<Vec<usize>>,
}

impl Partitions {
    fn build(table: &RssTable, max_m: usize) -> Self {
        let n = table.n();
        let h = table.min_segment();
        let mut cost = vec![vec![f64::INFINITY; n]; max_m + 1];
        let mut last = vec![vec![0usize; n]; max_m + 1];

        for j in h - 1..n {
            cost[0][j] = table.rss(0, j);
        }
        for m in 1..=max_m {
            for j in (m + 1) * h - 1..n {
                let mut best = f64::INFINITY;
                let mut arg = 0;
                for b in m * h - 1..=j - h {
                    let c = cost[m - 1][b] + table.rss(b + 1, j);
                    if c < best {
                        best = c;
                        arg = b;
                    }
                }
                cost[m][j] = best;
                last[m][j] = arg;
            }
        }
        Self { cost, last }
    }

    fn rss(&self, m: usize) -> f64 {
        let n = self.cost[m].len();
        self.cost[m][n - 1]
    }

    fn ends(&self, m: usize) -> Vec<usize> {
        let mut ends = Vec::with_capacity(m);
        let mut j = self.cost[m].len() - 1;
        for k in (1..=m).rev() {
            j = self.last[k][j];
            ends.push(j);
        }
        ends.reverse();
        ends
    }
}

impl SegmentationStrategy for BaiPerron {
    fn name(&self) -> &str {
        "bai_perron"
    }

    fn locate(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Vec<usize>> {
        let n = x.nrows();
        let p = x.ncols();
        let h = min_segment_size(n, p, self.min_segment_fraction);
        let feasible = (n / h).saturating_sub(1);
        let max_m = match self.break_count {
            BreakCount::Fixed(m) if m > feasible => {
                return Err(BreakError::InvalidInput(format!(
                    "{m} breaks do not fit {n} observations with minimum segment {h}"
                )));
            }
            BreakCount::Fixed(m) => m,
            BreakCount::Auto => self.max_breaks.map_or(feasible, |m| m.min(feasible)),
        };
        if n < h {
            return Ok(Vec::new());
        }

        let table = RssTable::new(x, y, h);
        let partitions = Partitions::build(&table, max_m);

        let chosen = match self.break_count {
            BreakCount::Fixed(m) => m,
            BreakCount::Auto => {
                let mut best = (0, f64::INFINITY);
                for m in 0..=max_m {
                    let criterion = bic(partitions.rss(m), n, p, m);
                    debug!(breaks = m, rss = partitions.rss(m), bic = criterion, "BIC candidate");
                    if criterion < best.1 {
                        best = (m, criterion);
                    }
                }
                best.0
            }
        };

        Ok(partitions.ends(chosen))
    }
}
