use regex::Regex;
use std::sync::OnceLock;

fn quoted_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']+)'").expect("static regex"))
}

/// Parse the `Perfumers` pseudo-list (e.g. `['Christian Carbonnel', 'Antoine Lie']`)
/// into `"Christian Carbonnel, Antoine Lie"`. Anything without quoted names gives "".
pub fn parse_perfumers(raw: &str) -> String {
    quoted_name_re()
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
