//! Coordinate reference system transformations.
//!
//! Implements the map projections found in earth-observation catalogs
//! from scratch: UTM/Transverse Mercator, Web Mercator, Albers Equal-Area,
//! Sinusoidal and Lambert Conformal Conic. Also resolves a raster's
//! GeoTIFF keys into one of these definitions.

pub mod albers;
pub mod definition;
pub mod ellipsoid;
pub mod error;
pub mod geokeys;
pub mod lambert;
pub mod mercator;
pub mod resolver;
pub mod sinusoidal;
pub mod transverse_mercator;

pub use albers::AlbersEqualArea;
pub use definition::{project_envelope, ConicParams, ProjectionDefinition};
pub use ellipsoid::Ellipsoid;
pub use error::ProjectionError;
pub use geokeys::GeoKeys;
pub use lambert::LambertConformal;
pub use mercator::WebMercator;
pub use resolver::resolve_projection;
pub use sinusoidal::Sinusoidal;
pub use transverse_mercator::TransverseMercator;

/// A forward/inverse map projection between geographic degrees and
/// projected meters.
pub trait MapProjection: Send + Sync {
    /// Geographic `(lon, lat)` in degrees to projected `(x, y)`.
    fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64);

    /// Projected `(x, y)` to geographic `(lon, lat)` in degrees.
    fn inverse(&self, x: f64, y: f64) -> (f64, f64);
}
