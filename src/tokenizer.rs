/// Splits `line` into the ordered sequence of non-empty substrings
/// separated by `delimiters`.
///
/// Any maximal run of delimiter characters counts as a single separator,
/// so adjacent delimiters never produce empty tokens. A line that is
/// empty or consists only of delimiters yields an empty vector.
pub fn tokenize<'a>(line: &'a str, delimiters: &[char]) -> Vec<&'a str> {
    line.split(|c: char| delimiters.contains(&c))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Tokenizes with the default delimiter set, a single space.
pub fn tokenize_spaces(line: &str) -> Vec<&str> {
    tokenize(line, &[' '])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_on_single_spaces() {
        assert_eq!(tokenize_spaces("A 3 foo"), vec!["A", "3", "foo"]);
    }

    #[test]
    fn collapses_delimiter_runs() {
        assert_eq!(tokenize_spaces("  A   3  foo "), vec!["A", "3", "foo"]);
    }

    #[test]
    fn blank_lines_have_no_tokens() {
        assert!(tokenize_spaces("").is_empty());
        assert!(tokenize_spaces("     ").is_empty());
    }

    #[test]
    fn custom_delimiter_set() {
        assert_eq!(tokenize("a,,b c", &[',', ' ']), vec!["a", "b", "c"]);
    }
}
