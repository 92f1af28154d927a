//! Title-to-slug rules for ideas.
//!
//! A slug is the lowercased alphanumeric content of a title with every
//! run of other characters collapsed into a single `-`. Slugs are unique
//! within a tenant; collisions are resolved by appending the idea number.

/// Slug used for titles that contain no alphanumeric character.
pub const FALLBACK_SLUG: &str = "idea";

/// Derive the base slug for a title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Pick a slug for idea `number` that does not collide with `taken`.
///
/// Returns `base` when free, otherwise `base-{number}`, then
/// `base-{number}-2`, `base-{number}-3`, ...
pub fn unique_slug<S: AsRef<str>>(base: &str, number: u32, taken: &[S]) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|t| t.as_ref() == candidate);

    if !is_taken(base) {
        return base.to_string();
    }

    let numbered = format!("{base}-{number}");
    if !is_taken(&numbered) {
        return numbered;
    }

    let mut suffix = 2u32;
    loop {
        let candidate = format!("{numbered}-{suffix}");
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes_words() {
        assert_eq!(slugify("My new idea"), "my-new-idea");
        assert_eq!(slugify("Idea #1"), "idea-1");
        assert_eq!(slugify("  Dark   mode!!  "), "dark-mode");
        assert_eq!(slugify("Support SSO / SAML (v2)"), "support-sso-saml-v2");
    }

    #[test]
    fn slugify_keeps_non_ascii_letters() {
        assert_eq!(slugify("Café Über"), "café-über");
    }

    #[test]
    fn slugify_falls_back_for_symbol_only_titles() {
        assert_eq!(slugify("?!?"), FALLBACK_SLUG);
        assert_eq!(slugify(""), FALLBACK_SLUG);
    }

    #[test]
    fn unique_slug_returns_base_when_free() {
        let taken: [&str; 0] = [];
        assert_eq!(unique_slug("dark-mode", 3, &taken), "dark-mode");
        assert_eq!(unique_slug("dark-mode", 3, &["dark-mode-3"]), "dark-mode");
    }

    #[test]
    fn unique_slug_appends_number_on_collision() {
        assert_eq!(unique_slug("dark-mode", 3, &["dark-mode"]), "dark-mode-3");
    }

    #[test]
    fn unique_slug_keeps_counting_past_numbered_collision() {
        let taken = ["dark-mode", "dark-mode-3", "dark-mode-3-2"];
        assert_eq!(unique_slug("dark-mode", 3, &taken), "dark-mode-3-3");
    }
}
