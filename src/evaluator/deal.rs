use tracing::debug;

use super::DealVerdict;

/// Pure deal detection: an absolute price floor plus median-based drop
/// detection against the window's accumulated history.
pub struct DealEvaluator {
    absolute_threshold: f64,
    relative_drop_pct: f64,
    min_data_points: usize,
}

impl DealEvaluator {
    pub fn new(absolute_threshold: f64, relative_drop_pct: f64, min_data_points: usize) -> Self {
        Self {
            absolute_threshold,
            relative_drop_pct,
            min_data_points,
        }
    }

    /// Decide whether a per-person price is a deal, given the prices
    /// previously observed for the same window. The rules apply in order,
    /// first match wins:
    ///
    /// 1. Strictly under the absolute threshold.
    /// 2. At or under `median * (1 - relative_drop_pct)`, once the history
    ///    holds at least `min_data_points` observations. The gate keeps a
    ///    single early outlier from skewing detection.
    ///
    /// `history` must not include the price being evaluated - a new
    /// observation never competes against itself.
    pub fn evaluate(&self, per_person_price: f64, history: &[f64]) -> DealVerdict {
        if per_person_price < self.absolute_threshold {
            return DealVerdict::deal(format!(
                "${per_person_price:.0}/person is under ${:.0} threshold",
                self.absolute_threshold
            ));
        }

        if history.len() >= self.min_data_points {
            let med = median(history);
            let drop_target = med * (1.0 - self.relative_drop_pct);
            if per_person_price <= drop_target {
                return DealVerdict::deal(format!(
                    "${per_person_price:.0}/person is {:.0}%+ below median ${med:.0}",
                    self.relative_drop_pct * 100.0
                ));
            }
            debug!(
                "No deal: ${per_person_price:.2} above drop target ${drop_target:.2} (median ${med:.2})"
            );
        } else {
            debug!(
                "No deal: {} of {} data points for relative detection",
                history.len(),
                self.min_data_points
            );
        }

        DealVerdict::no_deal()
    }
}

/// Middle value of the sorted sequence; mean of the two middle values for
/// even counts. Callers guarantee `prices` is non-empty.
fn median(prices: &[f64]) -> f64 {
    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
