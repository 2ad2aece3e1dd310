//! Parse-time configuration.

/// Default number of steps any single token (or scanner pass) may spend.
pub const DEFAULT_ITERATION_LIMIT: usize = 10_000_000;

/// Options controlling a parse.
///
/// # Examples
///
/// ```
/// use css_edit_tree::ParseOptions;
///
/// let options = ParseOptions::new()
///     .with_iteration_limit(1_000)
///     .with_change_recording(true);
/// assert_eq!(options.iteration_limit, 1_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Upper bound on the steps spent consuming one token. Exceeding it aborts the parse.
    pub iteration_limit: usize,
    /// Record every edit made to the parsed tree into a changeset.
    pub record_changes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            iteration_limit: DEFAULT_ITERATION_LIMIT,
            record_changes: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = limit.max(1);
        self
    }

    pub fn with_change_recording(mut self, record: bool) -> Self {
        self.record_changes = record;
        self
    }
}
