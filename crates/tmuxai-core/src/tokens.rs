/// Rough token count used to decide when to squash history.
///
/// Words weigh 1.3; every punctuation or symbol character counts as one more.
pub fn estimate_token_count(text: &str) -> usize {
    let words = text.split_whitespace().count();
    let symbols = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    (words as f64 * 1.3) as usize + symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(estimate_token_count(""), 0);
        assert_eq!(estimate_token_count("  \n\t"), 0);
    }

    #[test]
    fn words_and_symbols() {
        // 3 words * 1.3 = 3.9 -> 3, plus ',' and '!'.
        assert_eq!(estimate_token_count("hello, big world!"), 5);
        assert_eq!(estimate_token_count("ten words are here in this short test line ok"), 13);
    }

    #[test]
    fn grows_with_text() {
        let short = estimate_token_count("ls -la");
        let long = estimate_token_count("ls -la && cat /etc/hosts | grep localhost");
        assert!(long > short);
    }
}
