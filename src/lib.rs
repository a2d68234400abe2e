#![forbid(unsafe_code)]

//! Rust client for the GMTDS AIS density Web Map Service.
//!
//! The service only answers per-pixel `GetFeatureInfo` queries, so a density
//! raster is assembled by probing every cell of a virtual `WIDTH`x`HEIGHT`
//! rendering of the `ais:density` layer over a bounding box. All cell queries
//! run concurrently on one HTTP session under a single batch timeout; any
//! failing cell fails the whole grid.
//!
//! **Quick start**
//! ```no_run
//! use gmtds_client::{Client, ClientOptions, DensityGrid};
//!
//! # async fn run() -> Result<(), gmtds_client::Error> {
//! let client = Client::new(ClientOptions::default())?;
//!
//! // Longitude-major: value of cell (i, j) is at i * n_lat + j.
//! let values = client
//!     .fetch_grid((-10.0, 10.0), (40.0, 60.0), 20, 20, "2023-10-01T00:00:00Z")
//!     .await?;
//!
//! // Rows indexed by latitude bin.
//! let grid = DensityGrid::from_lon_major(&values, 20, 20)?;
//! grid.write_json("data.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! Cells the service has no data for come back as `NaN`.

mod client;
mod date;
mod error;
mod grid;
mod request;
mod sources;
mod url_builder;

pub use crate::client::{
    Client, ClientOptions, Connector, DEFAULT_BATCH_TIMEOUT, HttpConnector, HttpSession, Progress,
    Transport, fetch_cell,
};
pub use crate::date::{format_wms_time, normalize_wms_time, parse_wms_time};
pub use crate::error::{Error, Result};
pub use crate::grid::{BoundingBox, CellIndex, DensityGrid, cell_indices};
pub use crate::request::QueryParams;
pub use crate::url_builder::{
    AIS_DENSITY_LAYER, GEOJSON_INFO_FORMAT, LOITERING_FILTER, build_url, feature_info_params,
};
