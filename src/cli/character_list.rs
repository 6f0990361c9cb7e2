use crate::character::CharacterCatalog;
use crate::core::config::path_display;
use std::path::Path;

pub fn list_characters(catalog: &CharacterCatalog, source: &Path, selected: Option<&str>) {
    println!("Available characters (from {}):\n", path_display(source));

    for line in character_lines(catalog, selected) {
        println!("{line}");
    }

    println!("\n💡 Chat with a character with:");
    println!("   charchat -c <character_name>");
}

fn character_lines(catalog: &CharacterCatalog, selected: Option<&str>) -> Vec<String> {
    catalog
        .names()
        .map(|name| {
            if Some(name) == selected {
                format!("  • {name} (default)")
            } else {
                format!("  • {name}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_names_in_file_order_and_marks_default() {
        let catalog = CharacterCatalog::from_json_str(
            r#"{"Zorro": "a swordsman", "Ada": "a mathematician", "Nemo": "a captain"}"#,
        )
        .unwrap();

        assert_eq!(
            character_lines(&catalog, Some("Ada")),
            vec!["  • Zorro", "  • Ada (default)", "  • Nemo"]
        );
    }
}
