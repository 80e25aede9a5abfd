/// Build the challenge body: set the cookie for the whole site, then reload.
///
/// A client that runs the script comes back with the cookie and gets past the
/// challenge; one that doesn't is challenged again on every request.
pub fn challenge_script(cookie_name: &str, cookie_value: &str) -> String {
    format!(
        r#"<script>document.cookie="{}={}; path=/"; window.location.reload();</script>"#,
        cookie_name, cookie_value
    )
}

/// Find a cookie by name in one or more `Cookie` header values.
///
/// The first occurrence wins. Values are percent-decoded. Pairs without `=`
/// are skipped rather than treated as errors.
pub fn find_cookie<'a, I>(cookie_headers: I, name: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    for header in cookie_headers {
        for pair in header.split(';') {
            let Some((key, value)) = pair.trim().split_once('=') else {
                continue;
            };
            if key.trim() == name {
                return percent_decode(value.trim());
            }
        }
    }
    None
}

/// Check whether the challenge cookie is present with the exact expected value.
pub fn has_challenge_cookie<'a, I>(cookie_headers: I, name: &str, expected: &str) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    find_cookie(cookie_headers, name).is_some_and(|v| v == expected)
}

/// Decode `%XX` escapes. Returns `None` when the decoded bytes are not UTF-8,
/// so a garbled cookie reads as missing.
fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
