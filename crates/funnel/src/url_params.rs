use glasslead_core::attribution::UrlParams;

/// Base used to resolve relative page URLs such as `/book?year=2020`.
const RELATIVE_BASE: &str = "http://localhost/";

/// Extract funnel parameters from an absolute or relative page URL.
///
/// An unparsable URL yields no parameters.
pub fn params_from_url(url: &str) -> UrlParams {
    let parsed = reqwest::Url::parse(url)
        .or_else(|_| reqwest::Url::parse(RELATIVE_BASE).and_then(|base| base.join(url)));

    match parsed {
        Ok(url) => UrlParams::from_pairs(url.query_pairs()),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unparsable page URL");
            UrlParams::default()
        }
    }
}
