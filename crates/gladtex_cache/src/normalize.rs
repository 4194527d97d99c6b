//! Formula normalization.

/// Reduces a formula to the canonical form used as cache key.
///
/// The steps run in this order:
///
/// 1. every `{}` becomes a single space
/// 2. every tab becomes a space
/// 3. each pair of consecutive spaces becomes one space
/// 4. leading and trailing whitespace is stripped
///
/// Step 3 is a single left-to-right pass: four spaces become two and three
/// spaces become two, so long runs of blanks are only halved. Keys in existing
/// cache files depend on this.
pub fn normalize_formula(formula: &str) -> String {
    formula
        .replace("{}", " ")
        .replace('\t', " ")
        .replace("  ", " ")
        .trim()
        .to_string()
}
