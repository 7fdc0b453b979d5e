/// Text the reader highlighted, trimmed and known to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedText(String);

impl SelectedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Turn the raw selection at pointer release into a chat seed. Blank selections are ignored.
pub fn capture_selection(raw: &str) -> Option<SelectedText> {
    let text = raw.trim();
    if text.is_empty() {
        None
    } else {
        Some(SelectedText(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_trims() {
        let selected = capture_selection("  the spice must flow\n").unwrap();
        assert_eq!(selected.as_str(), "the spice must flow");
    }

    #[test]
    fn test_blank_selection_is_none() {
        assert!(capture_selection("").is_none());
        assert!(capture_selection(" \n\t ").is_none());
    }
}
