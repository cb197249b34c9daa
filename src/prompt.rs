use crate::types::PhotoStyle;

/// Fixed suffix appended to every generation prompt.
pub const QUALITY_SUFFIX: &str = "Focus on appetizing presentation and high quality.";

/// Render the generation prompt for one dish.
///
/// Pure function of `(style, dish_name)`; test fixtures rely on the exact text.
pub fn render(style: PhotoStyle, dish_name: &str) -> String {
    format!(
        "{} of a delicious {}. {}",
        style.prompt_prefix(),
        dish_name,
        QUALITY_SUFFIX
    )
}
