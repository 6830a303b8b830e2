/// Caller-owned progress surface for one job, e.g. the button that
/// started it or a terminal progress bar.
///
/// Methods are called while the tracker's registry lock is held: they
/// must return quickly and must not call back into the tracker.
pub trait ProgressDisplay: Send + Sync {
    /// Enter the busy state, showing `0%`.
    fn begin(&self);

    /// Show a whole-number completion percentage.
    fn set_percent(&self, percent: u8);

    /// Return to the appearance from before [`begin`](Self::begin).
    fn restore(&self);
}
