use cfgc_types::{AccessRights, TypeError};

/// Pending global read/write flags for the next parameter value.
///
/// Flags are set by `<read>`/`<write>` elements and consumed by exactly one
/// parameter: [`AccessTracker::take`] returns them and resets both to
/// `false`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessTracker {
    pending_read: bool,
    pending_write: bool,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read(&mut self, token: &str) -> Result<(), TypeError> {
        self.pending_read = AccessRights::parse_setting(token)?;
        Ok(())
    }

    pub fn set_write(&mut self, token: &str) -> Result<(), TypeError> {
        self.pending_write = AccessRights::parse_setting(token)?;
        Ok(())
    }

    /// Current `(read, write)` flags without consuming them.
    pub fn pending(&self) -> (bool, bool) {
        (self.pending_read, self.pending_write)
    }

    /// Consume the flags as `(read, write)` rights.
    pub fn take(&mut self) -> (AccessRights, AccessRights) {
        let rights = (
            AccessRights::from_flag(self.pending_read),
            AccessRights::from_flag(self.pending_write),
        );
        *self = Self::default();
        rights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_access() {
        let mut tracker = AccessTracker::new();
        assert_eq!(tracker.take(), (AccessRights::None, AccessRights::None));
    }

    #[test]
    fn take_consumes_flags() {
        let mut tracker = AccessTracker::new();
        tracker.set_read("true").unwrap();
        tracker.set_write("true").unwrap();
        assert_eq!(tracker.take(), (AccessRights::All, AccessRights::All));
        assert_eq!(tracker.pending(), (false, false));
        assert_eq!(tracker.take(), (AccessRights::None, AccessRights::None));
    }

    #[test]
    fn last_setting_wins() {
        let mut tracker = AccessTracker::new();
        tracker.set_read("true").unwrap();
        tracker.set_read("false").unwrap();
        tracker.set_write("true").unwrap();
        assert_eq!(tracker.take(), (AccessRights::None, AccessRights::All));
    }

    #[test]
    fn invalid_token_leaves_state() {
        let mut tracker = AccessTracker::new();
        tracker.set_write("true").unwrap();
        assert_eq!(
            tracker.set_write("yes"),
            Err(TypeError::InvalidAccessSetting("yes".into()))
        );
        assert_eq!(tracker.pending(), (false, true));
    }
}
