//! The sonargeo data model
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The side of the vessel imaged by a sidescan channel
///
/// The side determines the acoustic bearing of the beam and
/// therefore which raster edge lies under the sensor track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Deserialize, Serialize)]
pub enum Side {
    /// A channel imaging to port
    Port,
    /// A channel imaging to starboard
    Starboard,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Port => write!(f, "port"),
            Side::Starboard => write!(f, "starboard"),
        }
    }
}

/// Units used for the sensor coordinates of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Deserialize, Serialize)]
pub enum NavUnits {
    /// Projected coordinates in meters
    Meters,
    /// Latitude and longitude in degrees
    Degrees,
    /// Any other code found in the file
    Other(u16),
}

impl From<u16> for NavUnits {
    fn from(code: u16) -> Self {
        match code {
            0 => NavUnits::Meters,
            3 => NavUnits::Degrees,
            other => NavUnits::Other(other),
        }
    }
}

/// Description of one sonar channel in a file
#[derive(Debug, Clone, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct ChannelInfo {
    /// The side this channel images
    pub side: Side,
    /// The channel name as recorded by the acquisition software
    pub name: String,
}

/// File-level information needed to interpret the pings
#[derive(Debug, Clone, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct FileHeader {
    /// Units of the sensor coordinates
    pub nav_units: NavUnits,
    /// Number of sonar channels recorded
    pub channel_count: u16,
    /// One entry per recorded sonar channel
    pub channels: Vec<ChannelInfo>,
}

/// A single ping of one sidescan channel
#[derive(Debug, Clone, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct PingRecord {
    /// The ping number, increasing through the file
    pub ping_number: u32,
    /// The time at which the ping was acquired
    ///
    /// `None` if the recorded date or time is not valid.
    #[serde(with = "time::serde::timestamp::option")]
    pub timestamp: Option<OffsetDateTime>,
    /// Sensor latitude in degrees
    pub sensor_lat: f64,
    /// Sensor longitude in degrees
    pub sensor_lon: f64,
    /// Sensor heading in degrees clockwise from North
    pub heading_deg: f64,
    /// Slant range of the ping in meters
    pub slant_range_m: f64,
    /// Ground range of the ping in meters
    pub ground_range_m: f64,
    /// The amplitude samples in the order they are stored in the file
    ///
    /// A starboard channel starts at the sensor and ends at the outer
    /// swath edge. A port channel is stored the other way round, outer
    /// edge first, so the sensor track is the last sample.
    pub samples: Vec<u32>,
}

/// The ordered pings of a single channel
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// The side imaged by every ping in the channel
    pub side: Side,
    /// The pings in acquisition order
    pub pings: Vec<PingRecord>,
}

impl Channel {
    /// Create a new Channel from the given pings
    pub fn new(side: Side, pings: Vec<PingRecord>) -> Channel {
        Channel { side, pings }
    }

    /// The first and last ping, if there are any
    pub fn ends(&self) -> Option<(&PingRecord, &PingRecord)> {
        Some((self.pings.first()?, self.pings.last()?))
    }
}

/// A quantized single-band raster
///
/// Rows are pings and columns are samples. The buffers come from
/// the `image` crate so that they can be resampled and encoded directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    /// 8 bit samples
    U8(image::GrayImage),
    /// 16 bit samples
    U16(image::ImageBuffer<image::Luma<u16>, Vec<u16>>),
}

impl Raster {
    /// Width of the raster in pixels
    pub fn width(&self) -> u32 {
        match self {
            Raster::U8(img) => img.width(),
            Raster::U16(img) => img.width(),
        }
    }

    /// Height of the raster in pixels
    pub fn height(&self) -> u32 {
        match self {
            Raster::U8(img) => img.height(),
            Raster::U16(img) => img.height(),
        }
    }

    /// Bits per sample
    pub fn bitdepth(&self) -> u8 {
        match self {
            Raster::U8(_) => 8,
            Raster::U16(_) => 16,
        }
    }

    /// Convert to an `image::DynamicImage` for encoding
    pub fn to_dynamic(&self) -> image::DynamicImage {
        match self {
            Raster::U8(img) => image::DynamicImage::ImageLuma8(img.clone()),
            Raster::U16(img) => image::DynamicImage::ImageLuma16(img.clone()),
        }
    }
}

/// A correspondence between a pixel and a geographic position
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct GroundControlPoint {
    /// Pixel row
    pub row: f64,
    /// Pixel column
    pub col: f64,
    /// Longitude in degrees
    pub x: f64,
    /// Latitude in degrees
    pub y: f64,
    /// Elevation, always zero for sidescan mosaics
    pub z: f64,
}

impl GroundControlPoint {
    /// Create a new GroundControlPoint at zero elevation
    pub fn new(row: f64, col: f64, x: f64, y: f64) -> GroundControlPoint {
        GroundControlPoint {
            row,
            col,
            x,
            y,
            z: 0.0,
        }
    }
}

/// A six parameter affine map from pixel to geographic coordinates
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct AffineTransform {
    /// Pixel size in x
    pub a: f64,
    /// Rotation term of x along rows
    pub b: f64,
    /// x of the origin
    pub c: f64,
    /// Rotation term of y along columns
    pub d: f64,
    /// Pixel size in y
    pub e: f64,
    /// y of the origin
    pub f: f64,
}

impl AffineTransform {
    /// Apply the transform to a pixel position, returning (x, y)
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Determinant of the linear part
    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }
}

/// A coordinate reference system
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Deserialize, Serialize)]
pub struct SpatialReference {
    /// EPSG code of the system
    pub epsg: u16,
    /// OGC WKT description of the system
    pub wkt: String,
}

const WGS84_WKT: &str = concat!(
    r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,"#,
    r#"AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],"#,
    r#"PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],"#,
    r#"UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],"#,
    r#"AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4326"]]"#
);

impl SpatialReference {
    /// Geographic WGS 84, EPSG:4326
    pub fn wgs84() -> SpatialReference {
        SpatialReference {
            epsg: 4326,
            wkt: WGS84_WKT.to_string(),
        }
    }

    /// The identifier in `EPSG:<code>` form
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nav_units_from_code() {
        assert_eq!(NavUnits::from(3), NavUnits::Degrees);
        assert_eq!(NavUnits::from(0), NavUnits::Meters);
        assert_eq!(NavUnits::from(7), NavUnits::Other(7));
    }

    #[test]
    fn affine_apply() {
        let t = AffineTransform {
            a: 2.0,
            b: 0.5,
            c: 10.0,
            d: -0.25,
            e: -1.0,
            f: 60.0,
        };
        assert_eq!(t.apply(0.0, 0.0), (10.0, 60.0));
        assert_eq!(t.apply(4.0, 2.0), (19.0, 57.0));
        assert_eq!(t.determinant(), -2.0 + 0.125);
    }

    #[test]
    fn wgs84_identifier() {
        let srs = SpatialReference::wgs84();
        assert_eq!(srs.identifier(), "EPSG:4326");
        assert!(srs.wkt.ends_with(r#"AUTHORITY["EPSG","4326"]]"#));
    }
}
