/// Optimistic like state for one post or comment, as seen by the viewer.
///
/// A toggle flips the local value before the network call resolves and keeps
/// a snapshot of the pre-toggle pair. While a toggle is outstanding further
/// toggles are ignored, so at most one net unit of change is displayed per
/// resolved round trip. A failed round trip restores the snapshot exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeState {
    liked: bool,
    count: i64,
    pending: Option<Snapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    liked: bool,
    count: i64,
}

impl LikeState {
    pub fn new(liked: bool, count: i64) -> Self {
        Self {
            liked,
            count,
            pending: None,
        }
    }

    pub fn liked(&self) -> bool {
        self.liked
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Server-sourced hydration. Ignored while a toggle is outstanding so a
    /// late hydration response cannot clobber an optimistic value.
    pub fn hydrate_status(&mut self, liked: bool) {
        if self.pending.is_none() {
            self.liked = liked;
        }
    }

    pub fn hydrate_count(&mut self, count: i64) {
        if self.pending.is_none() {
            self.count = count.max(0);
        }
    }

    /// Applies the optimistic flip and returns true when the caller should
    /// issue the toggle request. Returns false while a prior toggle is still
    /// in flight; the call is ignored and no request may be issued.
    pub fn begin_toggle(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(Snapshot {
            liked: self.liked,
            count: self.count,
        });
        if self.liked {
            self.liked = false;
            self.count -= 1;
        } else {
            self.liked = true;
            self.count += 1;
        }
        true
    }

    /// Server confirmed the toggle; the optimistic value becomes real.
    pub fn commit(&mut self) {
        self.pending = None;
    }

    /// Server rejected the toggle (or the call failed); the pre-toggle pair
    /// is restored.
    pub fn rollback(&mut self) {
        if let Some(snapshot) = self.pending.take() {
            self.liked = snapshot.liked;
            self.count = snapshot.count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_applies_optimistic_flip() {
        let mut state = LikeState::new(false, 10);
        assert!(state.begin_toggle());
        assert!(state.liked());
        assert_eq!(state.count(), 11);
        assert!(state.in_flight());
    }

    #[test]
    fn reentrant_toggle_is_ignored_while_in_flight() {
        let mut state = LikeState::new(false, 10);
        assert!(state.begin_toggle());
        assert!(!state.begin_toggle());
        assert!(!state.begin_toggle());
        // One net unit regardless of how many times the user hammered it.
        assert_eq!(state.count(), 11);
        state.commit();
        assert_eq!(state.count(), 11);
        assert!(state.liked());
    }

    #[test]
    fn rollback_restores_pre_toggle_pair() {
        for (liked, count) in [(false, 0), (false, 10), (true, 1), (true, 999)] {
            let mut state = LikeState::new(liked, count);
            assert!(state.begin_toggle());
            state.rollback();
            assert_eq!(state.liked(), liked);
            assert_eq!(state.count(), count);
            assert!(!state.in_flight());
        }
    }

    #[test]
    fn failure_scenario_snaps_back() {
        let mut state = LikeState::new(false, 10);
        state.begin_toggle();
        assert_eq!((state.liked(), state.count()), (true, 11));
        state.rollback();
        assert_eq!((state.liked(), state.count()), (false, 10));
    }

    #[test]
    fn commit_allows_next_toggle() {
        let mut state = LikeState::new(false, 0);
        state.begin_toggle();
        state.commit();
        assert!(state.begin_toggle());
        assert!(!state.liked());
        assert_eq!(state.count(), 0);
    }

    #[test]
    fn hydration_ignored_while_pending() {
        let mut state = LikeState::new(false, 0);
        state.begin_toggle();
        state.hydrate_status(false);
        state.hydrate_count(42);
        assert!(state.liked());
        assert_eq!(state.count(), 1);

        state.commit();
        state.hydrate_count(42);
        assert_eq!(state.count(), 42);
    }

    #[test]
    fn hydrated_count_never_negative() {
        let mut state = LikeState::default();
        state.hydrate_count(-3);
        assert_eq!(state.count(), 0);
    }
}
