//! Track list filtering by class visibility and id search.

use serde::Serialize;

use crate::stats::TrackStatsMap;
use crate::types::{TrackClass, TrackId};

/// Per-class visibility toggles. Every class starts visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassVisibility {
    team_a: bool,
    team_b: bool,
    referee: bool,
}

impl Default for ClassVisibility {
    fn default() -> Self {
        Self {
            team_a: true,
            team_b: true,
            referee: true,
        }
    }
}

impl ClassVisibility {
    pub fn is_visible(&self, class: TrackClass) -> bool {
        *self.slot(class)
    }

    pub fn set(&mut self, class: TrackClass, visible: bool) {
        *self.slot_mut(class) = visible;
    }

    /// Flip one class and return its new visibility.
    pub fn toggle(&mut self, class: TrackClass) -> bool {
        let slot = self.slot_mut(class);
        *slot = !*slot;
        *slot
    }

    fn slot(&self, class: TrackClass) -> &bool {
        match class {
            TrackClass::TeamA => &self.team_a,
            TrackClass::TeamB => &self.team_b,
            TrackClass::Referee => &self.referee,
        }
    }

    fn slot_mut(&mut self, class: TrackClass) -> &mut bool {
        match class {
            TrackClass::TeamA => &mut self.team_a,
            TrackClass::TeamB => &mut self.team_b,
            TrackClass::Referee => &mut self.referee,
        }
    }
}

/// Active filter state of the track list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackFilter {
    pub visibility: ClassVisibility,
    /// Case-sensitive substring matched against the track id. Empty matches all.
    pub search_term: String,
}

impl TrackFilter {
    pub fn matches(&self, id: &TrackId, class: TrackClass) -> bool {
        self.visibility.is_visible(class)
            && (self.search_term.is_empty() || id.as_str().contains(&self.search_term))
    }
}

/// Ids from `stats` accepted by `filter`, in natural id order.
pub fn filter_track_ids(stats: &TrackStatsMap, filter: &TrackFilter) -> Vec<TrackId> {
    stats
        .iter()
        .filter(|(id, s)| filter.matches(id, s.class))
        .map(|(id, _)| id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TrackStats;

    fn stats_of(entries: &[(&str, TrackClass)]) -> TrackStatsMap {
        entries
            .iter()
            .map(|(id, class)| {
                (
                    TrackId::from(*id),
                    TrackStats {
                        class: *class,
                        occurrence_count: 1,
                        start_frame_index: 0,
                        start_time: 0.0,
                        duration_secs: 1.0,
                    },
                )
            })
            .collect()
    }

    fn ids(v: &[TrackId]) -> Vec<&str> {
        v.iter().map(TrackId::as_str).collect()
    }

    #[test]
    fn default_filter_keeps_everything() {
        let stats = stats_of(&[
            ("1", TrackClass::TeamA),
            ("2", TrackClass::TeamB),
            ("3", TrackClass::Referee),
        ]);
        let out = filter_track_ids(&stats, &TrackFilter::default());
        assert_eq!(ids(&out), vec!["1", "2", "3"]);
    }

    #[test]
    fn hidden_class_removed() {
        let stats = stats_of(&[("1", TrackClass::TeamA), ("2", TrackClass::Referee)]);
        let mut filter = TrackFilter::default();
        assert!(!filter.visibility.toggle(TrackClass::Referee));
        assert_eq!(ids(&filter_track_ids(&stats, &filter)), vec!["1"]);
    }

    #[test]
    fn search_is_substring_and_case_sensitive() {
        let stats = stats_of(&[
            ("12", TrackClass::TeamA),
            ("21", TrackClass::TeamA),
            ("3", TrackClass::TeamA),
            ("1_A", TrackClass::TeamB),
        ]);
        let filter = TrackFilter {
            search_term: "1".into(),
            ..Default::default()
        };
        assert_eq!(ids(&filter_track_ids(&stats, &filter)), vec!["1_A", "12", "21"]);

        let lower = TrackFilter {
            search_term: "_a".into(),
            ..Default::default()
        };
        assert!(filter_track_ids(&stats, &lower).is_empty());
    }

    #[test]
    fn search_and_visibility_combine() {
        let stats = stats_of(&[("14", TrackClass::TeamA), ("41", TrackClass::TeamB)]);
        let mut filter = TrackFilter {
            search_term: "4".into(),
            ..Default::default()
        };
        filter.visibility.set(TrackClass::TeamA, false);
        assert_eq!(ids(&filter_track_ids(&stats, &filter)), vec!["41"]);
    }

    #[test]
    fn toggle_twice_restores() {
        let mut v = ClassVisibility::default();
        v.toggle(TrackClass::TeamB);
        assert!(!v.is_visible(TrackClass::TeamB));
        v.toggle(TrackClass::TeamB);
        assert!(v.is_visible(TrackClass::TeamB));
    }
}
