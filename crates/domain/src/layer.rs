use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]").expect("valid regex"));

/// Bracketed tags in a layer name: `Inks [final] [print]` yields `final`, `print`.
pub fn extract_tags(layer_name: &str) -> Vec<&str> {
    TAG_PATTERN
        .captures_iter(layer_name)
        .filter_map(|captures| captures.get(1))
        .map(|tag| tag.as_str())
        .collect()
}

/// Visibility applied to layers that match neither tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UntaggedPolicy {
    #[default]
    LeaveAsIs,
    Show,
    Hide,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagFilter {
    pub show: BTreeSet<String>,
    pub hide: BTreeSet<String>,
    pub untagged: UntaggedPolicy,
}

impl TagFilter {
    /// Parses a comma separated tag list, e.g. `"wip, notes"`.
    pub fn parse_list(input: &str) -> BTreeSet<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_noop(&self) -> bool {
        self.show.is_empty() && self.hide.is_empty() && self.untagged == UntaggedPolicy::LeaveAsIs
    }

    /// Resolves the visibility of one layer. Hide wins when a layer carries
    /// tags from both sets.
    pub fn resolve(&self, layer_name: &str, visible: bool) -> bool {
        let tags = extract_tags(layer_name);
        if tags.iter().any(|tag| self.hide.contains(*tag)) {
            return false;
        }
        if tags.iter().any(|tag| self.show.contains(*tag)) {
            return true;
        }
        match self.untagged {
            UntaggedPolicy::LeaveAsIs => visible,
            UntaggedPolicy::Show => true,
            UntaggedPolicy::Hide => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(show: &str, hide: &str, untagged: UntaggedPolicy) -> TagFilter {
        TagFilter {
            show: TagFilter::parse_list(show),
            hide: TagFilter::parse_list(hide),
            untagged,
        }
    }

    #[test]
    fn extracts_zero_or_more_tags() {
        assert!(extract_tags("Background").is_empty());
        assert_eq!(extract_tags("Sketch [wip]"), vec!["wip"]);
        assert_eq!(extract_tags("Inks [final][print]"), vec!["final", "print"]);
    }

    #[test]
    fn sketch_inks_background_scenario() {
        let filter = filter("final", "wip", UntaggedPolicy::LeaveAsIs);
        assert!(!filter.resolve("Sketch [wip]", true));
        assert!(filter.resolve("Inks [final]", false));
        assert!(filter.resolve("Background", true));
        assert!(!filter.resolve("Background", false));
    }

    #[test]
    fn hide_wins_over_show() {
        let filter = filter("a", "b", UntaggedPolicy::Show);
        assert!(!filter.resolve("Layer [a] [b]", true));
    }

    #[test]
    fn untagged_policy_applies_to_unmatched_layers() {
        let show_all = filter("", "", UntaggedPolicy::Show);
        assert!(show_all.resolve("Colors", false));
        let hide_all = filter("", "", UntaggedPolicy::Hide);
        assert!(!hide_all.resolve("Colors [other]", true));
    }

    #[test]
    fn parse_list_trims_and_drops_empty_entries() {
        let tags = TagFilter::parse_list(" wip, ,final,");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["final", "wip"]);
    }
}
