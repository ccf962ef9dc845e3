// Scan links: deep links that carry an asset id, encoded into QR codes by the front end

use url::{form_urlencoded, Url};

pub const SCAN_QUERY_PARAM: &str = "assetId";

/// Link that opens `asset_id` on the dashboard at `base`.
///
/// Any existing `assetId` on `base` is replaced; other query parameters are kept.
pub fn scan_url(base: &str, asset_id: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != SCAN_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(SCAN_QUERY_PARAM, asset_id);
    Ok(url.into())
}

/// The asset id carried by a scan link's query string, if any
pub fn scanned_asset_id(query: &str) -> Option<String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == SCAN_QUERY_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}
