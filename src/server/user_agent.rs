//! Browser identification from `User-Agent` headers.

use crate::result::BrowserInfo;

/// Product tokens checked in order; the first match wins.
///
/// Edge and Opera also carry a `Chrome/` token, so they come first.
const PRODUCTS: &[(&str, &str)] = &[
    ("Edg/", "edge"),
    ("OPR/", "opera"),
    ("HeadlessChrome/", "chrome"),
    ("Chrome/", "chrome"),
    ("Firefox/", "firefox"),
];

/// Best-effort browser name and version from a `User-Agent` string.
pub fn parse_user_agent(user_agent: &str) -> BrowserInfo {
    for (token, name) in PRODUCTS {
        if let Some(start) = user_agent.find(token) {
            let version: String = user_agent[start + token.len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if version.is_empty() {
                continue;
            }
            return BrowserInfo::new(*name, version);
        }
    }
    BrowserInfo::unknown()
}
