//! Encoding rasters
use crate::error::Result;
use crate::model::{AffineTransform, Raster, SpatialReference};
use image::ImageFormat;
use std::io::{Seek, Write};
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

// GeoTIFF keys and codes
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const GEOG_ANGULAR_UNITS_GEO_KEY: u16 = 2054;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const ANGULAR_DEGREE: u16 = 9102;

/// The 4 x 4 row-major model transformation of a GeoTIFF
pub fn model_transformation(t: &AffineTransform) -> [f64; 16] {
    [
        t.a, t.b, 0.0, t.c, //
        t.d, t.e, 0.0, t.f, //
        0.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// The GeoKeyDirectory declaring a geographic system with pixel-is-area rasters
pub fn geo_key_directory(srs: &SpatialReference) -> Vec<u16> {
    let keys = [
        [GT_MODEL_TYPE_GEO_KEY, 0, 1, MODEL_TYPE_GEOGRAPHIC],
        [GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA],
        [GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, srs.epsg],
        [GEOG_ANGULAR_UNITS_GEO_KEY, 0, 1, ANGULAR_DEGREE],
    ];
    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.iter().flatten());
    directory
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    t: &AffineTransform,
    srs: &SpatialReference,
) -> Result<()> {
    dir.write_tag(Tag::ModelTransformationTag, &model_transformation(t)[..])?;
    dir.write_tag(Tag::GeoKeyDirectoryTag, &geo_key_directory(srs)[..])?;
    Ok(())
}

/// Write a single band GeoTIFF
///
/// The samples are stored uncompressed exactly as they are in the raster.
pub fn write_geotiff<W: Write + Seek>(
    writer: W,
    raster: &Raster,
    t: &AffineTransform,
    srs: &SpatialReference,
) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    match raster {
        Raster::U8(img) => {
            let mut image = encoder.new_image::<colortype::Gray8>(img.width(), img.height())?;
            write_geo_tags(image.encoder(), t, srs)?;
            image.write_data(img.as_raw())?;
        }
        Raster::U16(img) => {
            let mut image = encoder.new_image::<colortype::Gray16>(img.width(), img.height())?;
            write_geo_tags(image.encoder(), t, srs)?;
            image.write_data(img.as_raw())?;
        }
    }
    Ok(())
}

/// The image format used for the world-file-referenced copy of a raster
///
/// 8 bit rasters are written as JPEG. JPEG cannot hold 16 bit samples,
/// so those are written as PNG.
pub fn sidecar_format(raster: &Raster) -> ImageFormat {
    match raster {
        Raster::U8(_) => ImageFormat::Jpeg,
        Raster::U16(_) => ImageFormat::Png,
    }
}

/// The nominal compression of an image format, as GDAL names it
pub fn compression_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "JPEG",
        ImageFormat::Png => "DEFLATE",
        _ => "NONE",
    }
}

/// The file extension used for an image format
pub fn extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        _ => "tiff",
    }
}

/// Encode a raster with the `image` crate
pub fn write_image<W: Write + Seek>(writer: &mut W, raster: &Raster, format: ImageFormat) -> Result<()> {
    raster.to_dynamic().write_to(writer, format)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;
    use tiff::decoder::{Decoder, DecodingResult};

    fn transform() -> AffineTransform {
        AffineTransform {
            a: 1e-6,
            b: 2e-7,
            c: 10.5,
            d: -3e-7,
            e: -1e-6,
            f: 63.25,
        }
    }

    #[test]
    fn geo_keys_are_sorted() {
        let dir = geo_key_directory(&SpatialReference::wgs84());
        assert_eq!(&dir[..4], &[1, 1, 0, 4]);
        assert_eq!(dir.len(), 4 + 4 * 4);
        let ids: Vec<u16> = dir[4..].chunks(4).map(|k| k[0]).collect();
        assert_eq!(ids, vec![1024, 1025, 2048, 2054]);
        assert_eq!(dir[4 + 2 * 4 + 3], 4326);
    }

    #[test]
    fn geotiff_keeps_samples_and_transform() {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(5, 3, |x, y| Luma([(x * 1000 + y * 7) as u16]));
        let raster = Raster::U16(img.clone());

        let mut buf = Cursor::new(Vec::new());
        write_geotiff(&mut buf, &raster, &transform(), &SpatialReference::wgs84()).unwrap();

        buf.set_position(0);
        let mut decoder = Decoder::new(buf).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (5, 3));
        let matrix = decoder.get_tag_f64_vec(Tag::ModelTransformationTag).unwrap();
        assert_eq!(matrix, model_transformation(&transform()).to_vec());
        let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).unwrap();
        assert_eq!(keys, geo_key_directory(&SpatialReference::wgs84()));
        match decoder.read_image().unwrap() {
            DecodingResult::U16(data) => assert_eq!(data, img.into_raw()),
            _ => panic!("expected 16 bit samples"),
        }
    }

    #[test]
    fn sidecar_formats() {
        let r8 = Raster::U8(GrayImage::new(2, 2));
        let r16 = Raster::U16(ImageBuffer::new(2, 2));
        assert_eq!(sidecar_format(&r8), ImageFormat::Jpeg);
        assert_eq!(sidecar_format(&r16), ImageFormat::Png);
        assert_eq!(compression_name(ImageFormat::Jpeg), "JPEG");
        assert_eq!(extension(ImageFormat::Png), "png");
    }
}
