use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{Error, Result as EResult};
use crate::grid::{BoundingBox, CellIndex, cell_indices};
use crate::sources::{is_http_url, source_to_base_url};
use crate::url_builder::{build_url, feature_info_params};

pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Known endpoint name (`"gmtds"`) or an explicit `http(s)` WMS URL.
    pub source: String,
    /// Ceiling on the wall-clock time of a whole grid fetch.
    pub batch_timeout: Duration,
    pub user_agent: String,
    pub verify_tls: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            source: "gmtds".to_string(),
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            user_agent: "gmtds-client-rs/0.1".to_string(),
            verify_tls: true,
        }
    }
}

impl ClientOptions {
    /// Defaults overlaid with `GMTDS_SOURCE`, `GMTDS_BATCH_TIMEOUT_SECONDS`
    /// and `GMTDS_VERIFY_TLS`.
    pub fn from_env() -> EResult<Self> {
        let mut opts = Self::default();
        if let Some(source) = env_nonempty("GMTDS_SOURCE") {
            opts.source = source;
        }
        if let Some(secs) = env_nonempty("GMTDS_BATCH_TIMEOUT_SECONDS") {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::InvalidRequest(format!(
                    "failed to parse GMTDS_BATCH_TIMEOUT_SECONDS={secs} as u64"
                ))
            })?;
            opts.batch_timeout = Duration::from_secs(secs);
        }
        if let Some(verify) = env_nonempty("GMTDS_VERIFY_TLS") {
            opts.verify_tls = parse_bool(&verify).ok_or_else(|| {
                Error::InvalidRequest(format!("failed to parse GMTDS_VERIFY_TLS={verify} as bool"))
            })?;
        }
        Ok(opts)
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// One connection session: issues a GET and decodes the body as JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str) -> EResult<Value>;
}

/// Opens the session shared by every cell of one grid fetch.
pub trait Connector: Send + Sync {
    type Session: Transport;

    fn connect(&self) -> EResult<Self::Session>;
}

#[derive(Debug, Clone)]
pub struct HttpConnector {
    user_agent: String,
    verify_tls: bool,
}

impl HttpConnector {
    pub fn new(opts: &ClientOptions) -> Self {
        Self {
            user_agent: opts.user_agent.clone(),
            verify_tls: opts.verify_tls,
        }
    }
}

impl Connector for HttpConnector {
    type Session = HttpSession;

    fn connect(&self) -> EResult<HttpSession> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&self.user_agent).map_err(|_| {
            Error::InvalidRequest(format!("invalid user agent: {}", self.user_agent))
        })?;
        headers.insert(USER_AGENT, agent);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if !self.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(HttpSession {
            http: builder.build()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpSession {
    http: reqwest::Client,
}

#[async_trait]
impl Transport for HttpSession {
    async fn get_json(&self, url: &str) -> EResult<Value> {
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Reported once per completed cell during a grid fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub cell: CellIndex,
}

/// Query the density of pixel `(i, j)` in a `width`x`height` raster over
/// `bbox`.
///
/// Returns NaN when the service has no feature or no `DEFAULT` property for
/// the cell. Transport errors, HTTP error statuses, malformed JSON and
/// non-numeric values are returned as errors.
#[allow(clippy::too_many_arguments)]
pub async fn fetch_cell<T>(
    session: &T,
    base_url: &str,
    bbox: &str,
    width: u32,
    height: u32,
    i: u32,
    j: u32,
    time: &str,
) -> EResult<f64>
where
    T: Transport + ?Sized,
{
    let url = build_url(base_url, &feature_info_params(bbox, width, height, i, j, time));
    info!(i, j, "fetching density");
    let data = session.get_json(&url).await?;

    let Some(value) = default_property(&data, i, j)? else {
        info!(i, j, "no data");
        return Ok(f64::NAN);
    };
    info!(i, j, "density fetched");
    coerce_density(value, i, j)
}

/// Look up `features[0].properties.DEFAULT`.
///
/// A missing key or an empty feature list is `Ok(None)`; a node of the wrong
/// JSON type is an error.
fn default_property(data: &Value, i: u32, j: u32) -> EResult<Option<&Value>> {
    let Some(features) = member(data, "features", "$", i, j)? else {
        return Ok(None);
    };
    let first = match features {
        Value::Array(items) => items.first(),
        // Integer lookup on an object never matches a JSON key.
        Value::Object(_) => None,
        other => return Err(unexpected_shape("features", "array", other, i, j)),
    };
    let Some(first) = first else {
        return Ok(None);
    };
    let Some(properties) = member(first, "properties", "features[0]", i, j)? else {
        return Ok(None);
    };
    member(properties, "DEFAULT", "features[0].properties", i, j)
}

fn member<'a>(
    node: &'a Value,
    key: &str,
    path: &'static str,
    i: u32,
    j: u32,
) -> EResult<Option<&'a Value>> {
    match node {
        Value::Object(map) => Ok(map.get(key)),
        other => Err(unexpected_shape(path, "object", other, i, j)),
    }
}

fn unexpected_shape(
    path: &'static str,
    expected: &'static str,
    found: &Value,
    i: u32,
    j: u32,
) -> Error {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Error::UnexpectedShape {
        i,
        j,
        path,
        expected,
        found,
    }
}

fn coerce_density(value: &Value, i: u32, j: u32) -> EResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.ok_or_else(|| Error::NonNumericValue {
        i,
        j,
        value: value.clone(),
    })
}

#[derive(Debug, Clone)]
pub struct Client<C = HttpConnector> {
    opts: ClientOptions,
    base_url: String,
    connector: C,
}

impl Client<HttpConnector> {
    pub fn new(opts: ClientOptions) -> EResult<Self> {
        let connector = HttpConnector::new(&opts);
        Self::with_connector(opts, connector)
    }
}

impl<C: Connector> Client<C> {
    pub fn with_connector(opts: ClientOptions, connector: C) -> EResult<Self> {
        let base_url = if is_http_url(&opts.source) {
            opts.source.clone()
        } else {
            source_to_base_url(&opts.source)
                .ok_or_else(|| Error::InvalidRequest(format!("unknown source: {}", opts.source)))?
                .to_string()
        };

        Ok(Self {
            opts,
            base_url,
            connector,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.opts
    }

    /// Fetch a single cell on its own session.
    pub async fn fetch_cell(
        &self,
        bbox: &BoundingBox,
        width: u32,
        height: u32,
        cell: CellIndex,
        time: &str,
    ) -> EResult<f64> {
        let session = self.connector.connect()?;
        let bbox = bbox.to_string();
        fetch_cell(&session, &self.base_url, &bbox, width, height, cell.i, cell.j, time).await
    }

    /// Fetch every cell of an `n_longitudes`x`n_latitudes` raster covering
    /// the given window.
    ///
    /// The result is longitude-major: the value of cell `(i, j)` is at
    /// `i * n_latitudes + j`. Any failing cell, or exceeding
    /// [`ClientOptions::batch_timeout`], fails the whole fetch.
    pub async fn fetch_grid(
        &self,
        longitude_range: (f64, f64),
        latitude_range: (f64, f64),
        n_longitudes: u32,
        n_latitudes: u32,
        time: &str,
    ) -> EResult<Vec<f64>> {
        self.fetch_grid_with_progress(
            longitude_range,
            latitude_range,
            n_longitudes,
            n_latitudes,
            time,
            |_| {},
        )
        .await
    }

    /// Like [`Client::fetch_grid`], calling `on_progress` as each cell
    /// completes.
    pub async fn fetch_grid_with_progress<F>(
        &self,
        longitude_range: (f64, f64),
        latitude_range: (f64, f64),
        n_longitudes: u32,
        n_latitudes: u32,
        time: &str,
        on_progress: F,
    ) -> EResult<Vec<f64>>
    where
        F: Fn(Progress) + Sync,
    {
        let bbox = BoundingBox::from_ranges(longitude_range, latitude_range).to_string();
        let total = n_longitudes as usize * n_latitudes as usize;
        let span = info_span!("fetch_grid", bbox = %bbox, cells = total);

        async {
            let session = self.connector.connect()?;
            debug!(base_url = %self.base_url, time, "session opened");

            let completed = AtomicUsize::new(0);
            let (session, bbox, completed, on_progress) =
                (&session, &bbox, &completed, &on_progress);
            let base_url = self.base_url.as_str();

            let tasks = cell_indices(n_longitudes, n_latitudes).map(move |cell| async move {
                let value = fetch_cell(
                    session,
                    base_url,
                    bbox,
                    n_longitudes,
                    n_latitudes,
                    cell.i,
                    cell.j,
                    time,
                )
                .await?;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                on_progress(Progress {
                    completed: done,
                    total,
                    cell,
                });
                Ok::<f64, Error>(value)
            });

            let values = match timeout(self.opts.batch_timeout, try_join_all(tasks)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        completed = completed.load(Ordering::Relaxed),
                        total, "grid fetch timed out"
                    );
                    return Err(Error::Timeout(self.opts.batch_timeout));
                }
            };

            info!(cells = values.len(), "grid fetch complete");
            Ok::<Vec<f64>, Error>(values)
        }
        .instrument(span)
        .await
    }
}
