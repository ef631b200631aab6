//! Period navigation.
//!
//! A bounded cursor over the sorted period list. It starts on the latest
//! period; stepping past either end is a no-op rather than an error.

use crate::error::{NavigationError, Result};
use crate::records::Period;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeNavigator {
    periods: Vec<Period>,
    selected_index: usize,
}

impl TimeNavigator {
    /// Build a navigator over `periods`, positioned on the last one.
    ///
    /// The periods are sorted and deduplicated first.
    pub fn new(mut periods: Vec<Period>) -> Result<Self> {
        periods.sort();
        periods.dedup();
        let last = periods.len().checked_sub(1).ok_or(NavigationError::NoPeriods)?;
        Ok(Self {
            periods,
            selected_index: last,
        })
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Never true for a constructed navigator.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn selected(&self) -> &Period {
        &self.periods[self.selected_index]
    }

    pub fn is_at_start(&self) -> bool {
        self.selected_index == 0
    }

    pub fn is_at_end(&self) -> bool {
        self.selected_index + 1 == self.periods.len()
    }

    /// Step to the next period. Returns whether the selection moved.
    pub fn advance(&mut self) -> bool {
        self.jump_to(self.selected_index.saturating_add(1))
    }

    /// Step to the previous period. Returns whether the selection moved.
    pub fn retreat(&mut self) -> bool {
        self.jump_to(self.selected_index.saturating_sub(1))
    }

    /// Move to `index`, clamped into range (slider semantics).
    pub fn jump_to(&mut self, index: usize) -> bool {
        let index = index.min(self.periods.len() - 1);
        let moved = index != self.selected_index;
        self.selected_index = index;
        moved
    }

    pub fn first(&mut self) -> bool {
        self.jump_to(0)
    }

    pub fn last(&mut self) -> bool {
        self.jump_to(usize::MAX)
    }

    /// Select a period by raw label, or failing that by display label.
    /// Unknown labels leave the state unchanged.
    pub fn select(&mut self, label: &str) -> Result<bool> {
        let index = self
            .periods
            .iter()
            .position(|p| p.as_str() == label)
            .or_else(|| self.periods.iter().position(|p| p.display_label() == label))
            .ok_or_else(|| NavigationError::UnknownPeriod(label.to_string()))?;
        Ok(self.jump_to(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn navigator(labels: &[&str]) -> TimeNavigator {
        TimeNavigator::new(labels.iter().map(|l| Period::new(*l)).collect()).unwrap()
    }

    #[test]
    fn test_empty_is_an_error() {
        assert_eq!(TimeNavigator::new(vec![]), Err(NavigationError::NoPeriods));
    }

    #[test]
    fn test_starts_on_latest_sorted_period() {
        let nav = navigator(&["2024Q2", "2023Q4", "2024Q1", "2024Q1"]);
        assert_eq!(nav.len(), 3);
        assert_eq!(nav.selected().as_str(), "2024Q2");
        assert!(nav.is_at_end());
    }

    #[test]
    fn test_boundaries_are_idempotent() {
        let mut nav = navigator(&["a", "b", "c"]);
        assert!(!nav.advance());
        assert_eq!(nav.selected_index(), 2);
        assert!(nav.retreat());
        assert!(nav.retreat());
        assert!(!nav.retreat());
        assert!(nav.is_at_start());
    }

    #[test]
    fn test_select_unknown_leaves_state() {
        let mut nav = navigator(&["a", "b", "c"]);
        nav.first();
        let err = nav.select("zzz").unwrap_err();
        assert_eq!(err, NavigationError::UnknownPeriod("zzz".into()));
        assert_eq!(nav.selected_index(), 0);
        assert_eq!(nav.select("b"), Ok(true));
        assert_eq!(nav.selected().as_str(), "b");
    }

    #[test]
    fn test_select_by_display_label() {
        let mut nav = navigator(&["2024-2", "2024-3"]);
        nav.first();
        assert_eq!(nav.selected().display_label(), "2024Q2");
        assert_eq!(nav.select("2024Q3"), Ok(true));
        assert_eq!(nav.selected().as_str(), "2024-3");
        assert_eq!(nav.select("2024-2"), Ok(true));
        assert_eq!(nav.selected_index(), 0);
    }

    #[test]
    fn test_raw_label_wins_over_display_label() {
        // "2024-3" displays as "2024Q3", which is also another period's raw label
        let mut nav = navigator(&["2024-3", "2024Q3"]);
        nav.first();
        assert_eq!(nav.select("2024Q3"), Ok(true));
        assert_eq!(nav.selected().as_str(), "2024Q3");
    }

    #[test]
    fn test_jump_clamps() {
        let mut nav = navigator(&["a", "b"]);
        nav.first();
        assert!(nav.jump_to(99));
        assert_eq!(nav.selected_index(), 1);
    }

    #[test]
    fn test_single_period() {
        let mut nav = navigator(&["only"]);
        assert!(nav.is_at_start() && nav.is_at_end());
        assert!(!nav.advance());
        assert!(!nav.retreat());
    }

    proptest! {
        #[test]
        fn steps_saturate_at_the_ends(n in 1usize..20, extra in 0usize..10) {
            let labels: Vec<Period> = (0..n).map(|i| Period::new(format!("p{:02}", i))).collect();
            let mut nav = TimeNavigator::new(labels).unwrap();
            for _ in 0..n + extra {
                nav.advance();
            }
            prop_assert_eq!(nav.selected_index(), n - 1);
            for _ in 0..n + extra {
                nav.retreat();
            }
            prop_assert_eq!(nav.selected_index(), 0);
        }
    }
}
