//! Auto-weight heuristic for choosing lexical vs. vector weight.

/// Counts code indicators in `query` (parens, braces, `.`, `->`, `::`) and
/// derives `(lexical_weight, vector_weight)` from the count plus word
/// count. `≥5` indicators biases toward lexical (exact symbol lookup);
/// zero indicators with a long query biases toward an even split; anything
/// else falls back to the fixed default.
#[must_use]
pub fn auto_weights(query: &str) -> (f64, f64) {
    let indicators = query.chars().filter(|c| matches!(c, '(' | ')' | '{' | '}' | '.')).count()
        + query.matches("->").count()
        + query.matches("::").count();
    let word_count = query.split_whitespace().count();

    if indicators >= 5 {
        (0.3, 0.7)
    } else if indicators == 0 && word_count >= 4 {
        (0.5, 0.5)
    } else {
        (0.4, 0.6)
    }
}
