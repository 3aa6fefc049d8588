pub mod env;
pub mod quotes;
pub mod stripe;
pub mod tracing;

/// Compares two strings without short-circuiting on the first differing byte, so secret
/// comparisons don't leak how much of the secret was guessed correctly
pub fn constant_time_cmp(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (l, r)| acc | std::hint::black_box(l ^ r))
        == 0
}
