//! Header sanitizing for request logs.

use std::fmt;

use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, SET_COOKIE};

/// `Debug` view of a header map with credentials masked.
pub(crate) struct SanitizedHeaders<'a>(pub(crate) &'a HeaderMap);

impl fmt::Debug for SanitizedHeaders<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.0 {
            if name == AUTHORIZATION {
                let scheme = value
                    .to_str()
                    .ok()
                    .and_then(|v| v.split_whitespace().next())
                    .unwrap_or("");
                map.entry(&name.as_str(), &format_args!("{} [REDACTED]", scheme));
            } else if name == COOKIE || name == SET_COOKIE {
                map.entry(&name.as_str(), &format_args!("[REDACTED]"));
            } else {
                map.entry(&name.as_str(), &value.to_str().unwrap_or("<binary>"));
            }
        }
        map.finish()
    }
}
