/// Built-in WMS endpoints.
///
/// If `source` is already an `http(s)` URL, it is used as-is.
pub fn source_to_base_url(source: &str) -> Option<&'static str> {
    match source {
        "gmtds" => Some("https://gmtds.maplarge.com/ogc/ais:density/wms"),
        _ => None,
    }
}

pub fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
