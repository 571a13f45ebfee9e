//! Per-instrument fetch planning.

use chrono::NaiveDate;
use log::debug;

use super::model::InstrumentId;
use super::store::TimeSeriesStore;
use super::watermark::{Watermark, WatermarkResolver};
use crate::errors::Result;

/// The range to request from the source for one instrument.
///
/// Both bounds are inclusive. `start` is the watermark itself, not the day
/// after: the last stored day is re-fetched so that a revised value from the
/// source overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub instrument: InstrumentId,
    pub watermark: Watermark,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Decides what to request from the market data source.
#[derive(Debug, Clone)]
pub struct FetchPlanner {
    resolver: WatermarkResolver,
}

impl FetchPlanner {
    pub fn new(resolver: WatermarkResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &WatermarkResolver {
        &self.resolver
    }

    /// Plan the fetch for `instrument` as of `today`.
    ///
    /// Returns `None` when the watermark lies after `today` (nothing can be
    /// missing).
    pub fn plan<S>(
        &self,
        store: &S,
        instrument: &InstrumentId,
        today: NaiveDate,
    ) -> Result<Option<FetchPlan>>
    where
        S: TimeSeriesStore + ?Sized,
    {
        let watermark = self.resolver.resolve(store, instrument)?;
        let start = watermark.date();

        if start > today {
            debug!(
                "Watermark {} for {} is after {}, nothing to fetch",
                watermark, instrument, today
            );
            return Ok(None);
        }

        Ok(Some(FetchPlan {
            instrument: instrument.clone(),
            watermark,
            start,
            end: today,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::testing::MockPriceStore;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn planner() -> FetchPlanner {
        FetchPlanner::new(WatermarkResolver::new(day(1900, 1, 1)))
    }

    #[test]
    fn test_plan_refetches_watermark_day() {
        let x = InstrumentId::new("X");
        let mut store = MockPriceStore::new();
        store.seed(&x, &[(day(2024, 1, 5), 10.0)]);

        let plan = planner().plan(&store, &x, day(2024, 1, 8)).unwrap().unwrap();
        assert_eq!(plan.start, day(2024, 1, 5));
        assert_eq!(plan.end, day(2024, 1, 8));
        assert_eq!(plan.watermark, Watermark::Stored(day(2024, 1, 5)));
    }

    #[test]
    fn test_plan_when_watermark_is_today() {
        let x = InstrumentId::new("X");
        let mut store = MockPriceStore::new();
        store.seed(&x, &[(day(2024, 1, 8), 10.0)]);

        let plan = planner().plan(&store, &x, day(2024, 1, 8)).unwrap().unwrap();
        assert_eq!((plan.start, plan.end), (day(2024, 1, 8), day(2024, 1, 8)));
    }

    #[test]
    fn test_no_plan_when_watermark_after_today() {
        let x = InstrumentId::new("X");
        let mut store = MockPriceStore::new();
        store.seed(&x, &[(day(2024, 2, 1), 10.0)]);

        assert_eq!(planner().plan(&store, &x, day(2024, 1, 8)).unwrap(), None);
    }
}
