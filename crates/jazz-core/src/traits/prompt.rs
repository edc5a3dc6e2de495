//! Interactive terminal prompting seam.

use crate::error::Result;

/// Terminal confirmation and selection widgets used by interactive catch-up.
///
/// Implementations own the actual rendering; Jazz only supplies messages and
/// consumes answers. `multi_select` presents every item pre-selected and
/// returns the indices the user kept.
pub trait CatchUpPrompt: Send + Sync {
    fn confirm(&self, message: &str, default_yes: bool) -> Result<bool>;

    fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>>;
}
