/// Check the Referer header against the trusted substrings.
///
/// An absent header is acceptable. A present header, including an empty one,
/// must contain at least one trusted substring. Matching is case-sensitive
/// containment anywhere in the value, with no origin parsing, so
/// `https://evil.example/?awi.cuhk.edu.cn` is accepted.
pub fn is_trusted_referer(referer: Option<&str>, trusted: &[String]) -> bool {
    match referer {
        None => true,
        Some(value) => trusted.iter().any(|t| value.contains(t.as_str())),
    }
}
