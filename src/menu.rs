//! Menu text parsing.

use std::path::Path;

use crate::error::{Result, StudioError};
use crate::types::Dish;

/// Sample menu loaded before the user uploads their own.
pub const DEFAULT_MENU: &str = "Classic Burger
Margherita Pizza
Caesar Salad
Fish and Chips
Chocolate Lava Cake";

/// Split raw menu text into trimmed, non-empty lines, in order.
pub fn parse_menu(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Turn parsed lines into dishes, each with a fresh ID.
pub fn dishes_from_lines<I, S>(lines: I) -> Vec<Dish>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    lines.into_iter().map(Dish::new).collect()
}

/// Read and parse a plain-text menu file. Only `.txt` files are accepted.
pub fn load_menu_file(path: &Path) -> Result<Vec<String>> {
    let is_txt = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false);
    if !is_txt {
        return Err(StudioError::Validation("Please upload a .txt file.".into()));
    }

    let text = std::fs::read_to_string(path)?;
    Ok(parse_menu(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_menu_trims_and_drops_blank_lines() {
        let lines = parse_menu("  Classic Burger \n\n\tMargherita Pizza\r\n   \nCaesar Salad");
        assert_eq!(lines, vec!["Classic Burger", "Margherita Pizza", "Caesar Salad"]);
    }

    #[test]
    fn test_parse_menu_empty() {
        assert!(parse_menu("").is_empty());
        assert!(parse_menu("\n  \n").is_empty());
    }

    #[test]
    fn test_default_menu() {
        let lines = parse_menu(DEFAULT_MENU);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Classic Burger");
        assert_eq!(lines[4], "Chocolate Lava Cake");
    }

    #[test]
    fn test_dishes_preserve_order() {
        let dishes = dishes_from_lines(parse_menu("A\nB\nC"));
        let names: Vec<_> = dishes.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_load_menu_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.txt");
        std::fs::write(&path, "Soup\n\nSalad\n").unwrap();
        assert_eq!(load_menu_file(&path).unwrap(), vec!["Soup", "Salad"]);
    }

    #[test]
    fn test_load_menu_file_rejects_other_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.pdf");
        std::fs::write(&path, "Soup").unwrap();
        let err = load_menu_file(&path).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_load_menu_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_menu_file(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, StudioError::Io(_)));
    }
}
