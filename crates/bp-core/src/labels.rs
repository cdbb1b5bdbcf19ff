//! Well-known labels and the titles freshly created nodes start with.

/// Canonical float slot.
pub const MAIN: &str = "MAIN";
/// Canonical image slot; also the only slot with a selection mask.
pub const MAIN_DOC: &str = "MAIN DOC";
pub const POSITIVE_PROMPT: &str = "+ PROMPT";
pub const NEGATIVE_PROMPT: &str = "- PROMPT";
pub const SEED: &str = "SEED";

/// Prefix the plugin's node classes carry in the node library.
pub const BRAND_PREFIX: &str = "🔹";

/// Class type of the seed manager node inside a queued prompt.
pub const SEED_MANAGER_CLASS: &str = "🔹SeedManager";

/// Title a node should carry when it is first added to the graph.
///
/// Strips the brand prefix and maps library display names onto the default
/// slot labels. Titles the user already chose pass through unchanged.
pub fn default_label(title: &str) -> String {
    let title = title.strip_prefix(BRAND_PREFIX).unwrap_or(title);
    match title {
        "PS Seed" => SEED.to_string(),
        "PS Strings" => POSITIVE_PROMPT.to_string(),
        "PS Images" => MAIN_DOC.to_string(),
        "PS Slider Float" => MAIN.to_string(),
        "Reroute - Anything Everywhere" => "route".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_titles_map_to_slots() {
        assert_eq!(default_label("🔹PS Strings"), "+ PROMPT");
        assert_eq!(default_label("PS Images"), "MAIN DOC");
        assert_eq!(default_label("🔹PS Slider Float"), "MAIN");
    }

    #[test]
    fn user_titles_pass_through() {
        assert_eq!(default_label("denoise"), "denoise");
        assert_eq!(default_label("🔹custom"), "custom");
    }
}
