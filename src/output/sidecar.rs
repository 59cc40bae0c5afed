//! World files and GDAL auxiliary XML
//!
//! Both sidecars are encodings of the same [`AffineTransform`] and are
//! only ever produced from it.
use crate::error::{Error, Result};
use crate::model::{AffineTransform, SpatialReference};

/// Render a world file
///
/// The six lines are, in order: `a`, `d`, `b`, `e`, `c`, `f`.
/// Values are written with the shortest representation that parses
/// back to the same `f64`.
pub fn world_file(t: &AffineTransform) -> String {
    format!("{}\n{}\n{}\n{}\n{}\n{}\n", t.a, t.d, t.b, t.e, t.c, t.f)
}

/// Parse the six lines of a world file
///
/// # Errors
///
/// Returns [`Error::InputFormat`] unless the text holds exactly six numbers.
pub fn parse_world_file(text: &str) -> Result<AffineTransform> {
    let values = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.parse::<f64>()
                .map_err(|e| Error::InputFormat(format!("world file value '{}': {}", l, e)))
        })
        .collect::<Result<Vec<f64>>>()?;

    match values.as_slice() {
        &[a, d, b, e, c, f] => Ok(AffineTransform { a, b, c, d, e, f }),
        _ => Err(Error::InputFormat(format!(
            "world file has {} values, expected 6",
            values.len()
        ))),
    }
}

/// The world file extension paired with an image extension
///
/// This follows the usual convention of the first and last letter of
/// the image extension followed by `w`, e.g. `jpeg` gives `jgw`.
pub fn world_file_extension(image_extension: &str) -> String {
    let mut chars = image_extension.chars();
    match (chars.next(), chars.last()) {
        (Some(first), Some(last)) => format!("{}{}w", first, last),
        _ => "wld".to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render a GDAL PAM auxiliary XML document
///
/// The spatial reference maps the first data axis (rows) to the second
/// axis of the reference system and vice versa. `compression` names the
/// compression of the paired image and is informational only.
pub fn aux_xml(t: &AffineTransform, srs: &SpatialReference, compression: &str) -> String {
    format!(
        r#"<PAMDataset>
  <SRS dataAxisToSRSAxisMapping="2,1">{wkt}</SRS>
  <GeoTransform>{c}, {a}, {b}, {f}, {d}, {e}</GeoTransform>
  <Metadata>
    <MDI key="AREA_OR_POINT">Area</MDI>
  </Metadata>
  <PAMRasterBand band="1">
    <Metadata domain="IMAGE_STRUCTURE">
      <MDI key="COMPRESSION">{compression}</MDI>
    </Metadata>
  </PAMRasterBand>
</PAMDataset>
"#,
        wkt = escape(&srs.wkt),
        c = t.c,
        a = t.a,
        b = t.b,
        f = t.f,
        d = t.d,
        e = t.e,
        compression = escape(compression),
    )
}
