//! Native NetCDF reading using the netcdf library.
//!
//! Files are opened for the duration of one read and closed before the
//! function returns; no handle outlives the call.

use std::path::Path;
use std::sync::Once;

use tracing::debug;
use zonal_common::{CoordinateRegistration, GridDescriptor, Nodata, RasterLayer, RowOrder};

use crate::error::{NetCdfError, NetCdfResult};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Safe to call multiple times; only the first call has an effect. Call it
/// early in `main()` before any file is opened.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// What to read from a file: one 2-D data variable and its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRequest {
    /// Name of the 2-D data variable
    pub variable: String,
    /// Name of the 1-D longitude coordinate variable
    pub longitude: String,
    /// Name of the 1-D latitude coordinate variable
    pub latitude: String,
    /// Replaces the file's `_FillValue` / `missing_value` as nodata marker
    pub nodata: Option<f32>,
    /// How coordinate values relate to cells
    pub registration: CoordinateRegistration,
}

impl LayerRequest {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            longitude: "lon".to_string(),
            latitude: "lat".to_string(),
            nodata: None,
            registration: CoordinateRegistration::default(),
        }
    }

    pub fn with_coordinates(mut self, longitude: impl Into<String>, latitude: impl Into<String>) -> Self {
        self.longitude = longitude.into();
        self.latitude = latitude.into();
        self
    }

    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_registration(mut self, registration: CoordinateRegistration) -> Self {
        self.registration = registration;
        self
    }
}

/// Read one 2-D variable into a north-up [`RasterLayer`].
///
/// The variable must have exactly two dimensions, named after the latitude
/// and longitude coordinates (either order). Packed values are unpacked
/// with `scale_factor` / `add_offset`; `_FillValue` and `missing_value`
/// become NaN. The layer's provenance is the file path.
pub fn read_layer(path: impl AsRef<Path>, request: &LayerRequest) -> NetCdfResult<RasterLayer> {
    silence_hdf5_errors();
    let path = path.as_ref();

    let file = netcdf::open(path)
        .map_err(|e| NetCdfError::ReadError(format!("{}: {}", path.display(), e)))?;

    let var = file
        .variable(&request.variable)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", request.variable)))?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    if dims.len() != 2 {
        return Err(NetCdfError::NotTwoDimensional {
            variable: request.variable.clone(),
            dims,
        });
    }
    let transposed = if dims[0] == request.latitude && dims[1] == request.longitude {
        false
    } else if dims[0] == request.longitude && dims[1] == request.latitude {
        true
    } else {
        return Err(NetCdfError::InvalidFormat(format!(
            "dimensions {:?} of '{}' do not match coordinates ({}, {})",
            dims, request.variable, request.latitude, request.longitude
        )));
    };

    let lon = read_coordinate(&file, &request.longitude)?;
    let lat = read_coordinate(&file, &request.latitude)?;
    let (grid, order) = GridDescriptor::from_coordinates(&lon, &lat, request.registration)?;

    let raw: Vec<f32> = var
        .get_values(..)
        .map_err(|e| NetCdfError::ReadError(format!("Failed to read {}: {}", request.variable, e)))?;

    let packing = Packing::from_variable(&var);
    let mut data: Vec<f32> = raw.into_iter().map(|v| packing.unpack(v)).collect();
    if transposed {
        data = transpose(&data, grid.cols, grid.rows);
    }

    let nodata = match request.nodata {
        Some(sentinel) => Nodata::sentinel(sentinel),
        None => Nodata::nan(),
    };

    debug!(
        path = %path.display(),
        variable = %request.variable,
        rows = grid.rows,
        cols = grid.cols,
        south_up = order == RowOrder::SouthUp,
        transposed,
        "Read NetCDF layer"
    );

    Ok(RasterLayer::from_rows(
        grid,
        data,
        order,
        nodata,
        path.to_string_lossy(),
    )?)
}

/// Read only the grid of a file, without loading the data variable values.
pub fn read_grid(path: impl AsRef<Path>, request: &LayerRequest) -> NetCdfResult<GridDescriptor> {
    silence_hdf5_errors();
    let path = path.as_ref();
    let file = netcdf::open(path)
        .map_err(|e| NetCdfError::ReadError(format!("{}: {}", path.display(), e)))?;

    let lon = read_coordinate(&file, &request.longitude)?;
    let lat = read_coordinate(&file, &request.latitude)?;
    let (grid, _) = GridDescriptor::from_coordinates(&lon, &lat, request.registration)?;
    Ok(grid)
}

// =============================================================================
// Internal helpers
// =============================================================================

fn read_coordinate(file: &netcdf::File, name: &str) -> NetCdfResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} coordinate variable", name)))?;
    if var.dimensions().len() != 1 {
        return Err(NetCdfError::InvalidFormat(format!(
            "coordinate '{}' must be 1-D",
            name
        )));
    }
    var.get_values(..)
        .map_err(|e| NetCdfError::ReadError(format!("Failed to read {}: {}", name, e)))
}

/// CF packing and fill attributes of a data variable.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Packing {
    scale_factor: Option<f64>,
    add_offset: Option<f64>,
    fill_value: Option<f32>,
    missing_value: Option<f32>,
}

impl Packing {
    fn from_variable(var: &netcdf::Variable) -> Self {
        Self {
            scale_factor: get_f64_attr(var, "scale_factor"),
            add_offset: get_f64_attr(var, "add_offset"),
            fill_value: get_f32_attr(var, "_FillValue"),
            missing_value: get_f32_attr(var, "missing_value"),
        }
    }

    /// Raw stored value to physical value; fill markers become NaN.
    fn unpack(&self, raw: f32) -> f32 {
        if self.fill_value == Some(raw) || self.missing_value == Some(raw) {
            return f32::NAN;
        }
        if self.scale_factor.is_none() && self.add_offset.is_none() {
            return raw;
        }
        let scale = self.scale_factor.unwrap_or(1.0);
        let offset = self.add_offset.unwrap_or(0.0);
        (raw as f64 * scale + offset) as f32
    }
}

/// Transpose a `rows x cols` row-major buffer.
fn transpose(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0; data.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack() {
        let packing = Packing {
            scale_factor: Some(0.5),
            add_offset: Some(10.0),
            fill_value: Some(-32767.0),
            missing_value: None,
        };
        assert_eq!(packing.unpack(4.0), 12.0);
        assert!(packing.unpack(-32767.0).is_nan());
    }

    #[test]
    fn test_unpacked_passthrough() {
        let packing = Packing {
            scale_factor: None,
            add_offset: None,
            fill_value: None,
            missing_value: Some(-999.0),
        };
        assert_eq!(packing.unpack(3.25), 3.25);
        assert!(packing.unpack(-999.0).is_nan());
    }

    #[test]
    fn test_transpose() {
        // 2 rows x 3 cols -> 3 rows x 2 cols
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(transpose(&data, 2, 3), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_request_builder() {
        let req = LayerRequest::new("GWRPM25")
            .with_coordinates("longitude", "latitude")
            .with_nodata(Some(-999.0));
        assert_eq!(req.longitude, "longitude");
        assert_eq!(req.nodata, Some(-999.0));
        assert_eq!(req.registration, CoordinateRegistration::CellCenter);
    }
}
