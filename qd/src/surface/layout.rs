//! Key layout shared by the keyboard and wizard front-ends

/// Letter rows, right to left as rendered
pub const ARABIC_ROWS: [[&str; 10]; 3] = [
    ["ض", "ص", "ث", "ق", "ف", "غ", "ع", "ه", "خ", "ح"],
    ["ج", "ش", "س", "ي", "ب", "ل", "ا", "ت", "ن", "م"],
    ["ك", "ط", "ذ", "د", "ز", "ر", "و", "ء", "ظ", "ة"],
];

pub const SPACE_KEY: &str = "مسافة";
pub const COUNT_KEY: &str = "عدد";
pub const GENERATE_KEY: &str = "ابدأ الإنشاء";
pub const BACKSPACE_KEY: &str = "⌫";
pub const PASTE_KEY: &str = "Paste";

/// Topics offered by the wizard
pub const TOPICS: [&str; 6] = ["صبر", "حكمة", "وطن", "حب", "دين", "جمال"];

pub const DEFAULT_STYLE: &str = "طويل";

/// What a key press does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Letter(char),
    Space,
    Backspace,
    /// Open the line-count choices
    LineCountMenu,
    Generate,
    Paste,
}

/// Map a key label to its action
pub fn action_for_label(label: &str) -> Option<KeyAction> {
    match label {
        SPACE_KEY => Some(KeyAction::Space),
        COUNT_KEY => Some(KeyAction::LineCountMenu),
        GENERATE_KEY => Some(KeyAction::Generate),
        BACKSPACE_KEY => Some(KeyAction::Backspace),
        PASTE_KEY => Some(KeyAction::Paste),
        _ => ARABIC_ROWS
            .iter()
            .flatten()
            .find(|key| **key == label)
            .and_then(|key| key.chars().next())
            .map(KeyAction::Letter),
    }
}

pub fn is_topic(topic: &str) -> bool {
    TOPICS.contains(&topic)
}

/// Rows as printable lines, backspace on the last letter row
pub fn render_rows() -> Vec<String> {
    let mut lines: Vec<String> = ARABIC_ROWS.iter().map(|row| row.join(" ")).collect();
    if let Some(last) = lines.last_mut() {
        last.push(' ');
        last.push_str(BACKSPACE_KEY);
    }
    lines.push(format!("[{}] [{}] [{}]", SPACE_KEY, COUNT_KEY, GENERATE_KEY));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_for_label() {
        assert_eq!(action_for_label("ض"), Some(KeyAction::Letter('ض')));
        assert_eq!(action_for_label("ة"), Some(KeyAction::Letter('ة')));
        assert_eq!(action_for_label("مسافة"), Some(KeyAction::Space));
        assert_eq!(action_for_label("عدد"), Some(KeyAction::LineCountMenu));
        assert_eq!(action_for_label("ابدأ الإنشاء"), Some(KeyAction::Generate));
        assert_eq!(action_for_label("⌫"), Some(KeyAction::Backspace));
        assert_eq!(action_for_label("Paste"), Some(KeyAction::Paste));
        assert_eq!(action_for_label("x"), None);
    }

    #[test]
    fn test_topics() {
        assert!(is_topic("وطن"));
        assert!(!is_topic("بحر"));
    }

    #[test]
    fn test_render_rows() {
        let rows = render_rows();
        assert_eq!(rows.len(), 4);
        assert!(rows[2].ends_with(BACKSPACE_KEY));
        assert!(rows[3].contains(GENERATE_KEY));
    }
}
