//! Momentum ranking by cumulative return.

use crate::domain::panel::PricePanel;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedInstrument {
    pub instrument_id: String,
    pub cumulative_return: f64,
    pub price: f64,
}

/// Stateless ranker. Never mutates the panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumRanker;

impl MomentumRanker {
    /// Ranks every instrument observed on `date` by cumulative return,
    /// descending. Ties resolve by instrument id ascending.
    ///
    /// Instruments absent on `date`, or whose return is undefined, are left out.
    pub fn rank(&self, panel: &PricePanel, date: NaiveDate) -> Vec<RankedInstrument> {
        let Some(day) = panel.prices_on(date) else {
            return Vec::new();
        };

        let mut ranked: Vec<RankedInstrument> = day
            .iter()
            .filter_map(|(id, &price)| {
                panel
                    .cumulative_return(date, id)
                    .map(|cumulative_return| RankedInstrument {
                        instrument_id: id.clone(),
                        cumulative_return,
                        price,
                    })
            })
            .collect();

        ranked.sort_by(compare_ranked);
        ranked
    }

    /// Top `n` of [`rank`](Self::rank).
    pub fn top(&self, panel: &PricePanel, date: NaiveDate, n: usize) -> Vec<RankedInstrument> {
        let mut ranked = self.rank(panel, date);
        ranked.truncate(n);
        ranked
    }

    /// Ranks every panel date in parallel. Output is in ascending date order.
    pub fn rank_all(&self, panel: &PricePanel) -> Vec<(NaiveDate, Vec<RankedInstrument>)> {
        panel
            .dates()
            .par_iter()
            .map(|&date| (date, self.rank(panel, date)))
            .collect()
    }
}

fn compare_ranked(a: &RankedInstrument, b: &RankedInstrument) -> Ordering {
    b.cumulative_return
        .total_cmp(&a.cumulative_return)
        .then_with(|| a.instrument_id.cmp(&b.instrument_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::observation::PriceObservation;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, day).unwrap()
    }

    fn panel(rows: &[(u32, &str, f64)]) -> PricePanel {
        PricePanel::from_observations(
            rows.iter()
                .map(|&(day, id, p)| PriceObservation::new(d(day), id, p)),
        )
        .unwrap()
    }

    fn ids(ranked: &[RankedInstrument]) -> Vec<&str> {
        ranked.iter().map(|r| r.instrument_id.as_str()).collect()
    }

    #[test]
    fn ranks_by_return_descending() {
        let p = panel(&[
            (1, "A", 10.0),
            (1, "B", 10.0),
            (1, "C", 10.0),
            (2, "A", 11.0),
            (2, "B", 15.0),
            (2, "C", 9.0),
        ]);
        let ranked = MomentumRanker.rank(&p, d(2));
        assert_eq!(ids(&ranked), vec!["B", "A", "C"]);
        assert!((ranked[0].cumulative_return - 0.5).abs() < 1e-12);
        assert!((ranked[0].price - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_break_by_instrument_id() {
        let p = panel(&[
            (1, "ZEC", 5.0),
            (1, "ADA", 1.0),
            (1, "MKR", 2.0),
            (2, "ZEC", 10.0),
            (2, "ADA", 2.0),
            (2, "MKR", 4.0),
        ]);
        let first = MomentumRanker.rank(&p, d(2));
        assert_eq!(ids(&first), vec!["ADA", "MKR", "ZEC"]);
        for _ in 0..10 {
            assert_eq!(MomentumRanker.rank(&p, d(2)), first);
        }
    }

    #[test]
    fn absent_instruments_are_excluded() {
        let p = panel(&[(1, "A", 1.0), (1, "B", 1.0), (2, "A", 2.0)]);
        assert_eq!(ids(&MomentumRanker.rank(&p, d(2))), vec!["A"]);
    }

    #[test]
    fn newcomers_rank_at_zero_return() {
        let p = panel(&[(1, "A", 1.0), (2, "A", 0.5), (2, "NEW", 7.0)]);
        let ranked = MomentumRanker.rank(&p, d(2));
        assert_eq!(ids(&ranked), vec!["NEW", "A"]);
        assert_eq!(ranked[0].cumulative_return, 0.0);
    }

    #[test]
    fn revival_from_zero_ranks_first() {
        let p = panel(&[
            (1, "A", 1.0),
            (1, "DEAD", 0.0),
            (2, "A", 3.0),
            (2, "DEAD", 0.0),
            (3, "A", 4.0),
            (3, "DEAD", 0.01),
        ]);
        assert_eq!(ids(&MomentumRanker.rank(&p, d(2))), vec!["A"]);
        let ranked = MomentumRanker.rank(&p, d(3));
        assert_eq!(ids(&ranked), vec!["DEAD", "A"]);
        assert_eq!(ranked[0].cumulative_return, f64::INFINITY);
    }

    #[test]
    fn unknown_date_ranks_nothing() {
        let p = panel(&[(1, "A", 1.0)]);
        assert!(MomentumRanker.rank(&p, d(9)).is_empty());
    }

    #[test]
    fn top_truncates() {
        let p = panel(&[(1, "A", 1.0), (1, "B", 2.0), (1, "C", 3.0)]);
        assert_eq!(MomentumRanker.top(&p, d(1), 2).len(), 2);
        assert_eq!(MomentumRanker.top(&p, d(1), 10).len(), 3);
        assert!(MomentumRanker.top(&p, d(1), 0).is_empty());
    }

    #[test]
    fn rank_all_preserves_date_order() {
        let p = panel(&[(3, "A", 1.0), (1, "A", 1.0), (2, "A", 1.0), (2, "B", 1.0)]);
        let all = MomentumRanker.rank_all(&p);
        let dates: Vec<_> = all.iter().map(|(date, _)| *date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3)]);
        assert_eq!(all[1].1, MomentumRanker.rank(&p, d(2)));
    }
}
