//! Helpers derived from a Fragrantica product URL: the numeric perfume ID,
//! the bottle image on the fimgs.net CDN, and the storefront slug.
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

use super::text::slug_segment;

fn trailing_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\.html$").expect("static regex"))
}

/// Extract the numeric perfume ID from a URL such as
/// `https://www.fragrantica.com/perfume/xerjoff/accento-overdose-pride-edition-74630.html`.
pub fn extract_fragrantica_id(url: &str) -> Option<String> {
    trailing_id_re()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Bottle image (375x500) for the URL, or a deterministic picsum placeholder
/// seeded by the last 10 alphanumeric characters of the URL.
pub fn build_image_url(url: &str) -> String {
    if let Some(id) = extract_fragrantica_id(url) {
        return format!("https://fimgs.net/mdimg/perfume/375x500.{id}.jpg");
    }
    let alnum: Vec<char> = url.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let seed: String = alnum[alnum.len().saturating_sub(10)..].iter().collect();
    format!("https://picsum.photos/seed/{seed}/375/500")
}

/// `{name}-{brand}-{suffix}`; the suffix is the Fragrantica ID or a random
/// number in 10000..=99999 when the URL carries none.
pub fn make_slug(name: &str, brand: &str, fragrantica_id: Option<&str>) -> String {
    let suffix = match fragrantica_id {
        Some(id) => id.to_string(),
        None => rand::thread_rng().gen_range(10_000..=99_999).to_string(),
    };
    format!("{}-{}-{}", slug_segment(name), slug_segment(brand), suffix)
}
