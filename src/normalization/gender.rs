/// Display string used when the source row has no gender.
pub const DEFAULT_GENDER: &str = "for women and men";

/// Map the cleaned dataset's gender column to the storefront display string.
///
/// Unrecognized non-empty values pass through trimmed.
pub fn map_gender(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "women" => "for women".to_string(),
        "men" => "for men".to_string(),
        "unisex" | "" => DEFAULT_GENDER.to_string(),
        _ => trimmed.to_string(),
    }
}
