use std::sync::{PoisonError, RwLock};

use dream_proto::config::{ParentalConfig, UNBOUNDED_RATING};

/// Read-only view of the user's parental-control preferences.
pub trait PreferenceSource: Send + Sync + 'static {
    fn require_rating(&self) -> bool;
    fn max_rating(&self) -> i32;
}

/// Snapshot of the rating preferences taken at the start of a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingFilter {
    pub require_rating: bool,
    pub max_rating: i32,
}

impl RatingFilter {
    pub fn snapshot<P: PreferenceSource + ?Sized>(prefs: &P) -> Self {
        Self {
            require_rating: prefs.require_rating(),
            max_rating: prefs.max_rating(),
        }
    }

    /// Upper bound to send to the server, `None` for the unbounded sentinel.
    pub fn max_official_rating(&self) -> Option<String> {
        (self.max_rating != UNBOUNDED_RATING).then(|| self.max_rating.to_string())
    }

    /// `Some(true)` restricts to rated items; `None` leaves it to the server.
    pub fn has_parental_rating(&self) -> Option<bool> {
        self.require_rating.then_some(true)
    }
}

/// In-memory preference store seeded from config.  Changes made through the
/// HTTP API are picked up on the next poll and are not written back.
#[derive(Debug)]
pub struct LivePreferences {
    inner: RwLock<ParentalConfig>,
}

impl LivePreferences {
    pub fn new(initial: ParentalConfig) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub fn set_require_rating(&self, require: bool) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .require_rating = require;
    }

    pub fn set_max_rating(&self, max_rating: i32) {
        // Anything below the sentinel means "no bound" too.
        let value = if max_rating < UNBOUNDED_RATING {
            UNBOUNDED_RATING
        } else {
            max_rating
        };
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .max_rating = value;
    }
}

impl PreferenceSource for LivePreferences {
    fn require_rating(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .require_rating
    }

    fn max_rating(&self) -> i32 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .max_rating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_sentinel_drops_upper_bound() {
        let filter = RatingFilter {
            require_rating: true,
            max_rating: UNBOUNDED_RATING,
        };
        assert_eq!(filter.max_official_rating(), None);
        assert_eq!(filter.has_parental_rating(), Some(true));

        let filter = RatingFilter {
            require_rating: false,
            max_rating: UNBOUNDED_RATING,
        };
        assert_eq!(filter.max_official_rating(), None);
        assert_eq!(filter.has_parental_rating(), None);
    }

    #[test]
    fn test_bounded_rating_passes_through() {
        let filter = RatingFilter {
            require_rating: false,
            max_rating: 13,
        };
        assert_eq!(filter.max_official_rating().as_deref(), Some("13"));
    }

    #[test]
    fn test_live_changes_visible_in_next_snapshot() {
        let prefs = LivePreferences::new(ParentalConfig::default());
        let before = RatingFilter::snapshot(&prefs);
        assert_eq!(before.max_rating, UNBOUNDED_RATING);

        prefs.set_max_rating(16);
        prefs.set_require_rating(true);
        let after = RatingFilter::snapshot(&prefs);
        assert_eq!(after.max_rating, 16);
        assert!(after.require_rating);

        prefs.set_max_rating(-7);
        assert_eq!(prefs.max_rating(), UNBOUNDED_RATING);
    }
}
