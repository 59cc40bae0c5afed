//! Converting a sonar file into georeferenced artifacts
use crate::algorithms::gcp::build_gcps;
use crate::algorithms::geodesy::{swath_edge, Geodesy, SphericalEarth};
use crate::algorithms::normalize::normalize;
use crate::algorithms::transform::from_gcps;
use crate::config::ConvertConfig;
use crate::error::{ConversionError, Error, Result, Stage, StageContext};
use crate::model::{AffineTransform, Channel, FileHeader, GroundControlPoint, Raster, SpatialReference};
use crate::output::{self, raster, sidecar};
use crate::parser::xtf;
use binrw::io::BufReader;
use image::ImageFormat;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The files produced for one input
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    /// The image paired with the sidecars
    pub image: PathBuf,
    /// The world file
    pub world_file: PathBuf,
    /// The GDAL auxiliary XML
    pub aux_xml: PathBuf,
    /// The GeoTIFF
    pub geotiff: PathBuf,
}

/// Read the single sidescan channel of an XTF file on disk
///
/// The file handle is closed before this returns.
pub fn read_file(path: &Path) -> Result<(FileHeader, Channel)> {
    let f = std::fs::File::open(path)
        .map_err(|e| Error::InputFormat(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(f);
    xtf::read_channel(reader)
}

fn raster_rows(channel: &Channel) -> Vec<&[u32]> {
    channel.pings.iter().map(|p| p.samples.as_slice()).collect()
}

/// The corner control points of a raster built from `channel`
///
/// The first and last ping are located with `earth`.
pub fn control_points<G: Geodesy>(
    channel: &Channel,
    raster: &Raster,
    earth: &G,
) -> Result<[GroundControlPoint; 4]> {
    let (first, last) = channel
        .ends()
        .ok_or_else(|| Error::InputFormat("channel has no pings".to_string()))?;
    let first = swath_edge(earth, first, channel.side);
    let last = swath_edge(earth, last, channel.side);
    debug!("First ping edge {:?}, last ping edge {:?}", first, last);

    let gcps = build_gcps(&first, &last, channel.side, raster.height(), raster.width())?;
    info!("Control points: {:?}", gcps);
    Ok(gcps)
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InputFormat(format!("{} has no file name", path.display())))
}

fn create_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::Output(format!("{}: {}", dir.display(), e)))
}

fn write_text(w: &mut impl Write, text: &str) -> Result<()> {
    w.write_all(text.as_bytes())
        .map_err(|e| Error::Output(e.to_string()))
}

/// Encode and commit every artifact for a georeferenced raster
///
/// Given input stem `S` this writes `S.jpeg` (or `S.png` for 16 bit
/// rasters), its world file and auxiliary XML, and `S_geotiff.tif`.
pub fn write_artifacts(
    stem: &str,
    output_dir: &Path,
    raster: &Raster,
    transform: &AffineTransform,
    srs: &SpatialReference,
) -> Result<Artifacts> {
    create_output_dir(output_dir)?;

    let format = raster::sidecar_format(raster);
    let ext = raster::extension(format);
    let artifacts = Artifacts {
        image: output_dir.join(format!("{}.{}", stem, ext)),
        world_file: output_dir.join(format!("{}.{}", stem, sidecar::world_file_extension(ext))),
        aux_xml: output_dir.join(format!("{}.{}.aux.xml", stem, ext)),
        geotiff: output_dir.join(format!("{}_geotiff.tif", stem)),
    };

    let staged = vec![
        output::stage(&artifacts.image, |w| raster::write_image(w, raster, format))?,
        output::stage(&artifacts.world_file, |w| {
            write_text(w, &sidecar::world_file(transform))
        })?,
        output::stage(&artifacts.aux_xml, |w| {
            write_text(
                w,
                &sidecar::aux_xml(transform, srs, raster::compression_name(format)),
            )
        })?,
        output::stage(&artifacts.geotiff, |w| {
            raster::write_geotiff(w, raster, transform, srs)
        })?,
    ];

    for path in output::commit(staged)? {
        info!("Saved {}", path.display());
    }
    Ok(artifacts)
}

/// Convert one XTF file into a georeferenced raster with sidecars
///
/// Every stage runs before anything is written; on failure no artifact
/// for this input exists in `output_dir`.
///
/// # Errors
///
/// Returns a [`ConversionError`] naming the input and the failed stage.
pub fn convert_file(
    input: &Path,
    output_dir: &Path,
    config: &ConvertConfig,
) -> std::result::Result<Artifacts, ConversionError> {
    info!("Processing file: {}", input.display());
    let stem = file_stem(input).stage(input, Stage::Read)?;
    let (_, channel) = read_file(input).stage(input, Stage::Read)?;

    let raster = normalize(&raster_rows(&channel), config).stage(input, Stage::Normalize)?;

    let gcps = control_points(&channel, &raster, &SphericalEarth::default())
        .stage(input, Stage::Geodesy)?;
    let transform = from_gcps(&gcps).stage(input, Stage::Transform)?;
    info!("Transform: {:?}", transform);

    write_artifacts(
        &stem,
        output_dir,
        &raster,
        &transform,
        &SpatialReference::wgs84(),
    )
    .stage(input, Stage::Write)
}

/// Convert one XTF file into a plain TIFF without georeferencing
///
/// # Errors
///
/// Returns a [`ConversionError`] naming the input and the failed stage.
pub fn render_file(
    input: &Path,
    output_dir: &Path,
    config: &ConvertConfig,
) -> std::result::Result<PathBuf, ConversionError> {
    info!("Processing file: {}", input.display());
    let stem = file_stem(input).stage(input, Stage::Read)?;
    let (_, channel) = read_file(input).stage(input, Stage::Read)?;

    let raster = normalize(&raster_rows(&channel), config).stage(input, Stage::Normalize)?;

    let path = output_dir.join(format!("{}.tiff", stem));
    let write = || -> Result<PathBuf> {
        create_output_dir(output_dir)?;
        let staged = output::stage(&path, |w| {
            raster::write_image(w, &raster, ImageFormat::Tiff)
        })?;
        let mut paths = output::commit(vec![staged])?;
        paths
            .pop()
            .ok_or_else(|| Error::Output("nothing was written".to_string()))
    };
    let path = write().stage(input, Stage::Write)?;
    info!(
        "Saved {}, width {}, height {}",
        path.display(),
        raster.width(),
        raster.height()
    );
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{PingRecord, Side};
    use approx::assert_abs_diff_eq;

    fn channel(side: Side) -> Channel {
        let pings = (0..20)
            .map(|i| PingRecord {
                ping_number: i,
                timestamp: Some(time::OffsetDateTime::UNIX_EPOCH),
                sensor_lat: 60.0 + f64::from(i) * 1e-5,
                sensor_lon: 5.0,
                heading_deg: 0.0,
                slant_range_m: 52.0,
                ground_range_m: 50.0,
                samples: (0..32).map(|c| (c * 13 + i * 7) % 500 + 10).collect(),
            })
            .collect();
        Channel::new(side, pings)
    }

    #[test]
    fn control_points_follow_the_track() {
        let ch = channel(Side::Starboard);
        let config = ConvertConfig {
            resize_half_width: false,
            ..Default::default()
        };
        let raster = normalize(&raster_rows(&ch), &config).unwrap();
        let gcps = control_points(&ch, &raster, &SphericalEarth::default()).unwrap();

        // top-left is the sensor at the last ping
        assert_abs_diff_eq!(gcps[0].y, 60.0 + 19.0 * 1e-5, epsilon = 1e-12);
        assert_abs_diff_eq!(gcps[0].x, 5.0, epsilon = 1e-12);
        // bottom-right lies east of the sensor at the first ping
        assert!(gcps[2].x > 5.0);
        assert_eq!(gcps[2].row, 19.0);
        assert_eq!(gcps[2].col, f64::from(raster.width() - 1));

        let t = from_gcps(&gcps).unwrap();
        for g in &gcps {
            let (x, y) = t.apply(g.col, g.row);
            assert_abs_diff_eq!(x, g.x, epsilon = 1e-6);
            assert_abs_diff_eq!(y, g.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn artifacts_are_written_together() {
        let ch = channel(Side::Port);
        let config = ConvertConfig::default();
        let raster = normalize(&raster_rows(&ch), &config).unwrap();
        let gcps = control_points(&ch, &raster, &SphericalEarth::default()).unwrap();
        let t = from_gcps(&gcps).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let a = write_artifacts("survey", &out, &raster, &t, &SpatialReference::wgs84()).unwrap();

        assert_eq!(a.image, out.join("survey.jpeg"));
        assert_eq!(a.world_file, out.join("survey.jgw"));
        assert_eq!(a.aux_xml, out.join("survey.jpeg.aux.xml"));
        assert_eq!(a.geotiff, out.join("survey_geotiff.tif"));
        for p in [&a.image, &a.world_file, &a.aux_xml, &a.geotiff] {
            assert!(p.exists(), "{} missing", p.display());
        }

        let world = std::fs::read_to_string(&a.world_file).unwrap();
        assert_eq!(sidecar::parse_world_file(&world).unwrap(), t);
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 4);
    }
}
