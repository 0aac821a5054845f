use std::{fmt::Write, sync::Arc};

use url::Url;

/// Reduces an absolute url to the origin sitetally keeps time for.
///
/// Path, query and fragment are dropped. The `https://` prefix is dropped as well since it's the
/// common case, while `http://` and any other scheme stay visible. Urls that can't be parsed or
/// don't have a host (`about:blank`, `data:`, local files) produce [None].
pub fn clean_url(raw: &str) -> Option<Arc<str>> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str().filter(|v| !v.is_empty())?;

    let mut origin = match parsed.scheme() {
        "https" => String::new(),
        scheme => format!("{scheme}://"),
    };
    origin.push_str(host);
    if let Some(port) = parsed.port() {
        // Writing into a String can't fail.
        let _ = write!(origin, ":{port}");
    }
    Some(origin.into())
}
