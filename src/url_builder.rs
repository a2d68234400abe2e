use url::form_urlencoded;

use crate::request::QueryParams;

pub const AIS_DENSITY_LAYER: &str = "ais:density";
pub const LOITERING_FILTER: &str = "category_column='Loitering' AND category='NonLoitering'";
pub const GEOJSON_INFO_FORMAT: &str = "application/vnd.geo+json";

/// Render `base?k1=v1&k2=v2...` with form-urlencoded keys and values.
pub fn build_url(base: &str, params: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter() {
        serializer.append_pair(key, value);
    }
    format!("{base}?{}", serializer.finish())
}

/// GetFeatureInfo parameters querying pixel `(i, j)` of a `width`x`height`
/// rendering of the AIS density layer over `bbox`.
pub fn feature_info_params(
    bbox: &str,
    width: u32,
    height: u32,
    i: u32,
    j: u32,
    time: &str,
) -> QueryParams {
    QueryParams::new()
        .kw("SERVICE", "WMS")
        .kw("VERSION", "1.3.0")
        .kw("REQUEST", "GetFeatureInfo")
        .kw("BBOX", bbox)
        .kw("CRS", "EPSG:4326")
        .kw("WIDTH", width.to_string())
        .kw("HEIGHT", height.to_string())
        .kw("LAYERS", AIS_DENSITY_LAYER)
        .kw("FORMAT", "image/png")
        .kw("TRANSPARENT", "TRUE")
        .kw("time", time)
        .kw("CQL_FILTER", LOITERING_FILTER)
        .kw("query_layers", AIS_DENSITY_LAYER)
        .kw("info_format", GEOJSON_INFO_FORMAT)
        .kw("feature_count", "1")
        .kw("i", i.to_string())
        .kw("j", j.to_string())
}
