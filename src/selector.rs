//! Target resolution: turning a name list / regex pattern / "all" into the
//! concrete set of running containers a tick will act on.

use rand::seq::SliceRandom;
use regex::Regex;
use thiserror::Error;

use crate::container::Container;
use crate::runtime::{RuntimeClient, RuntimeError};

/// Prefix that marks a target argument as a regex rather than a literal name.
pub const PATTERN_PREFIX: &str = "re2:";

#[derive(Debug, Clone)]
pub enum Selector {
    /// No names and no pattern: every running container.
    All,
    /// Literal container names, matched against the display name.
    NameList(Vec<String>),
    /// A compiled regex, matched against the display name.
    Pattern(Regex),
}

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl Selector {
    /// Build a selector from the CLI's target arguments: zero arguments is
    /// `All`; a single `re2:`-prefixed argument is `Pattern` with the
    /// prefix stripped; anything else is `NameList`.
    ///
    /// Stripping uses `strip_prefix`, not a trim-set operation, which
    /// would also eat any leading `r`/`e`/`2`/`:` characters from the
    /// expression itself.
    pub fn from_targets(targets: &[String]) -> Result<Self, SelectorError> {
        if targets.is_empty() {
            return Ok(Selector::All);
        }
        if targets.len() == 1 {
            if let Some(pattern) = targets[0].strip_prefix(PATTERN_PREFIX) {
                return Ok(Selector::Pattern(Regex::new(pattern)?));
            }
        }
        Ok(Selector::NameList(targets.to_vec()))
    }

    fn matches(&self, container: &Container) -> bool {
        match self {
            Selector::All => true,
            Selector::NameList(names) => names.iter().any(|n| n == container.display_name()),
            Selector::Pattern(re) => re.is_match(container.display_name()),
        }
    }
}

/// Resolve the current target set: list running containers, filter by
/// `selector`, then (if `random` is set and the match set is non-empty)
/// narrow to a single uniformly-chosen element.
///
/// An empty match set is not an error, the dispatcher treats it as a
/// no-op tick.
pub async fn resolve(
    client: &dyn RuntimeClient,
    selector: &Selector,
    random: bool,
) -> Result<Vec<Container>, RuntimeError> {
    let running = client.list_running().await?;
    let mut matched: Vec<Container> = running.into_iter().filter(|c| selector.matches(c)).collect();

    if random && !matched.is_empty() {
        let mut rng = rand::thread_rng();
        let chosen = matched.choose(&mut rng).cloned().expect("non-empty checked above");
        matched = vec![chosen];
    }

    Ok(matched)
}
