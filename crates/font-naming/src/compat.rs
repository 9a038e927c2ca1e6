//! Legacy-compatible family/subfamily folding.
//!
//! Legacy name IDs 1 and 2 only understand the four styles Regular, Bold,
//! Italic and Bold Italic. Any other style is folded into the family name.

/// Styles that legacy consumers can express without folding.
pub const STANDARD_FOUR: &[&str] = &["Regular", "Bold", "Italic", "Bold Italic"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityName {
    pub family: String,
    pub style: String,
    pub standard_four: bool,
}

impl CompatibilityName {
    /// Subfamily written to name ID 2.
    ///
    /// On the standard-four path this is the original style, otherwise the
    /// folded one (`Regular` or `Italic`).
    pub fn subfamily<'a>(&'a self, original_style: &'a str) -> &'a str {
        if self.standard_four { original_style } else { &self.style }
    }

    /// Full font name (name ID 4) for the given legacy subfamily.
    pub fn full_name(&self, subfamily: &str) -> String {
        if subfamily == "Regular" {
            self.family.clone()
        } else {
            format!("{} {subfamily}", self.family)
        }
    }
}

/// Compute the legacy family/subfamily pair for `style` within `family`.
pub fn compatibility_name(family: &str, style: &str) -> CompatibilityName {
    if STANDARD_FOUR.contains(&style) {
        return CompatibilityName {
            family: family.to_string(),
            style: style.to_string(),
            standard_four: true,
        };
    }

    // "ExtraLight" would overflow legacy name limits, "XLight" does not.
    let style = match style.strip_prefix("Extra") {
        Some(rest) => format!("X{rest}"),
        None => style.to_string(),
    };

    if style.contains("Italic") {
        CompatibilityName {
            family: format!("{family} {}", style.replacen("Italic", "", 1).trim()),
            style: "Italic".to_string(),
            standard_four: false,
        }
    } else {
        CompatibilityName {
            family: format!("{family} {style}"),
            style: "Regular".to_string(),
            standard_four: false,
        }
    }
}
