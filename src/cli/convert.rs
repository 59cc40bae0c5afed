//! Convert and render files from the command line
use super::RasterOptions;
use crate::batch;
use crate::error::{BatchFailed, ConversionError};
use std::io::{stdout, Write};
use std::path::PathBuf;

fn report<T, F>(
    outcomes: &[(PathBuf, Result<T, ConversionError>)],
    mut describe: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut(&T) -> Vec<PathBuf>,
{
    let mut writer = stdout().lock();
    let mut failed = 0;
    for (input, res) in outcomes {
        match res {
            Ok(artifacts) => {
                writeln!(writer, "{}", input.display())?;
                for path in describe(artifacts) {
                    writeln!(writer, "\t{}", path.display())?;
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}", e);
            }
        }
    }
    writeln!(
        writer,
        "Converted {} of {} files",
        outcomes.len() - failed,
        outcomes.len()
    )?;

    if failed > 0 {
        return Err(Box::new(BatchFailed {
            failed,
            total: outcomes.len(),
        }));
    }
    Ok(())
}

/// Convert every input to a georeferenced image with sidecars and a GeoTIFF
pub fn convert(options: &RasterOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.config()?;
    let inputs = batch::input_files(&options.input)?;
    let outcomes = batch::convert_all(&inputs, &options.output, &config);
    report(&outcomes, |a| {
        vec![
            a.image.clone(),
            a.world_file.clone(),
            a.aux_xml.clone(),
            a.geotiff.clone(),
        ]
    })
}

/// Render every input to a plain TIFF
pub fn render(options: &RasterOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.config()?;
    let inputs = batch::input_files(&options.input)?;
    let outcomes = batch::render_all(&inputs, &options.output, &config);
    report(&outcomes, |p| vec![p.clone()])
}
