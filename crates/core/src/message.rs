/// Measure token and notes extracted from slash-command text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMessage {
    /// First whitespace-delimited word, not yet validated as numeric.
    pub measure_token: String,
    pub notes: String,
}

/// Splits `text` into a measure token and space-joined notes.
///
/// Returns `None` when `text` holds no words at all.
pub fn parse_message(text: &str) -> Option<ParsedMessage> {
    let mut words = text.split_whitespace();
    let measure_token = words.next()?.to_owned();
    let notes = words.collect::<Vec<_>>().join(" ");

    Some(ParsedMessage { measure_token, notes })
}

#[cfg(test)]
mod tests {
    use super::{parse_message, ParsedMessage};

    fn parsed(measure_token: &str, notes: &str) -> Option<ParsedMessage> {
        Some(ParsedMessage { measure_token: measure_token.to_owned(), notes: notes.to_owned() })
    }

    #[test]
    fn splits_measure_from_notes() {
        assert_eq!(parse_message("4 hello world"), parsed("4", "hello world"));
        assert_eq!(parse_message("4 Had awesome dinner!"), parsed("4", "Had awesome dinner!"));
    }

    #[test]
    fn single_word_has_empty_notes() {
        assert_eq!(parse_message("4"), parsed("4", ""));
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(parse_message("  7\t long \n  day   ahead "), parsed("7", "long day ahead"));
    }

    #[test]
    fn measure_token_is_returned_verbatim() {
        assert_eq!(parse_message("A hello world"), parsed("A", "hello world"));
        assert_eq!(parse_message("-3 meh"), parsed("-3", "meh"));
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert_eq!(parse_message(""), None);
        assert_eq!(parse_message(" \t\n"), None);
    }
}
