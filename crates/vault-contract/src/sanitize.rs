use aho_corasick::AhoCorasick;

/// Secrets this short are excluded from the pattern set — matching them would
/// redact unrelated text (an empty password would match everything).
const MIN_SECRET_LEN: usize = 3;

/// Replaces every occurrence of every non-trivial secret in `text` with `***`.
///
/// Used on every tool response, error message, and diagnostic the core emits,
/// per the sanitization contract.
pub fn sanitize_text(text: &str, secrets: &[&str]) -> String {
    let patterns: Vec<&str> = secrets
        .iter()
        .copied()
        .filter(|secret| secret.len() >= MIN_SECRET_LEN)
        .collect();
    if patterns.is_empty() {
        return text.to_string();
    }
    let automaton = match AhoCorasick::new(&patterns) {
        Ok(automaton) => automaton,
        Err(_) => return text.to_string(),
    };
    automaton.replace_all(text, &vec!["***"; patterns.len()])
}
