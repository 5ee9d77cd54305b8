/// Detects and removes the configured wakeword from transcribed text.
///
/// `strip` is pure and total: text without the wakeword passes through with
/// only whitespace normalization, so applying it twice yields the same result.
#[derive(Debug, Clone)]
pub struct WakewordStripper {
    word: String,
    case_sensitive: bool,
    leading_only: bool,
}

impl WakewordStripper {
    pub fn new(word: &str, case_sensitive: bool, leading_only: bool) -> Self {
        Self {
            word: word.trim().to_string(),
            case_sensitive,
            leading_only,
        }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn detect(&self, text: &str) -> bool {
        if text.trim().is_empty() || self.word.is_empty() {
            return false;
        }
        match (self.case_sensitive, self.leading_only) {
            (true, true) => text.trim_start().starts_with(&self.word),
            (true, false) => text.contains(&self.word),
            (false, true) => text
                .trim_start()
                .to_lowercase()
                .starts_with(&self.word.to_lowercase()),
            (false, false) => text.to_lowercase().contains(&self.word.to_lowercase()),
        }
    }

    /// Remove one occurrence of the wakeword and collapse the whitespace
    /// around it.
    pub fn strip(&self, text: &str) -> String {
        if !self.detect(text) {
            return normalize_spaces(text);
        }
        let removed = if self.leading_only {
            let trimmed = text.trim_start();
            without_prefix(trimmed, &self.word, self.case_sensitive)
                .unwrap_or(trimmed)
                .to_string()
        } else {
            remove_first_occurrence(text, &self.word, self.case_sensitive)
        };
        normalize_spaces(&removed)
    }
}

fn without_prefix<'a>(text: &'a str, word: &str, case_sensitive: bool) -> Option<&'a str> {
    if case_sensitive {
        return text.strip_prefix(word);
    }
    let head = text.get(..word.len())?;
    if head.eq_ignore_ascii_case(word) {
        text.get(word.len()..)
    } else {
        None
    }
}

fn remove_first_occurrence(text: &str, word: &str, case_sensitive: bool) -> String {
    let position = if case_sensitive {
        text.find(word)
    } else {
        text.to_lowercase().find(&word.to_lowercase())
    };
    match position {
        Some(start) => {
            let mut result = String::with_capacity(text.len());
            result.push_str(&text[..start]);
            result.push_str(&text[start + word.len()..]);
            result
        }
        None => text.to_string(),
    }
}

fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripper() -> WakewordStripper {
        WakewordStripper::new("borealis", false, true)
    }

    #[test]
    fn strips_leading_wakeword_case_insensitively() {
        assert_eq!(stripper().strip("Borealis lock the screen"), "lock the screen");
        assert_eq!(stripper().strip("BOREALIS  lock  the screen"), "lock the screen");
    }

    #[test]
    fn idempotent_when_wakeword_absent() {
        let stripped = stripper().strip("lock the screen");
        assert_eq!(stripped, "lock the screen");
        assert_eq!(stripper().strip(&stripped), stripped);
    }

    #[test]
    fn leading_only_mode_ignores_interior_occurrences() {
        let s = stripper();
        assert!(!s.detect("please borealis lock"));
        assert_eq!(s.strip("please borealis lock"), "please borealis lock");
    }

    #[test]
    fn anywhere_mode_removes_a_single_interior_occurrence() {
        let s = WakewordStripper::new("borealis", false, false);
        assert_eq!(s.strip("please Borealis lock the screen"), "please lock the screen");
        assert_eq!(
            s.strip("borealis borealis lock"),
            "borealis lock"
        );
    }

    #[test]
    fn case_sensitive_mode_requires_exact_case() {
        let s = WakewordStripper::new("Borealis", true, true);
        assert!(s.detect("Borealis lock"));
        assert!(!s.detect("borealis lock"));
        assert_eq!(s.strip("borealis lock"), "borealis lock");
    }

    #[test]
    fn empty_text_passes_through() {
        assert_eq!(stripper().strip(""), "");
        assert_eq!(stripper().strip("   "), "");
    }
}
