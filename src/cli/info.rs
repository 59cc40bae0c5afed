//! Print info about a sonar file

use crate::algorithms::geodesy::{Geodesy, SphericalEarth};
use crate::model::{FileHeader, PingRecord};
use crate::parser::xtf;
use binrw::io::BufReader;
use std::collections::BTreeSet;
use std::io::{stdout, Write};
use std::path::Path;
use time::OffsetDateTime;

/// Print info about a sonar file
pub fn info<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let f = std::fs::File::open(path.as_ref())?;
    let reader = BufReader::new(f);
    let (header, pings) = xtf::read_pings(reader)?;

    let mut writer = stdout().lock();
    writeln!(writer, "File: {}", path.as_ref().display())?;
    writeln!(writer, "Format: XTF")?;
    write_report(&mut writer, &header, &pings)?;
    Ok(())
}

fn time_or_unknown(t: Option<OffsetDateTime>) -> String {
    match t {
        Some(t) => t.to_string(),
        None => "unknown time".to_string(),
    }
}

/// Write the summary of a header and its pings
pub fn write_report<W: Write>(
    writer: &mut W,
    header: &FileHeader,
    pings: &[PingRecord],
) -> std::io::Result<()> {
    writeln!(writer, "Navigation units: {:?}", header.nav_units)?;
    writeln!(writer, "Number of sonar channels: {}", header.channel_count)?;
    for (i, chan) in header.channels.iter().enumerate() {
        writeln!(writer, "\t{}: {} ({})", i, chan.name, chan.side)?;
    }
    writeln!(writer, "Number of pings: {}", pings.len())?;

    let lengths: BTreeSet<usize> = pings.iter().map(|p| p.samples.len()).collect();
    writeln!(writer, "Unique lengths of pings:")?;
    for length in &lengths {
        writeln!(writer, "\t{}", length)?;
    }

    let (first, last) = match (pings.first(), pings.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(()),
    };

    writeln!(
        writer,
        "First ping: {} at {}, lat {:.7} lon {:.7}",
        first.ping_number,
        time_or_unknown(first.timestamp),
        first.sensor_lat,
        first.sensor_lon
    )?;
    writeln!(
        writer,
        "Last ping: {} at {}, lat {:.7} lon {:.7}",
        last.ping_number,
        time_or_unknown(last.timestamp),
        last.sensor_lat,
        last.sensor_lon
    )?;
    if let (Some(start), Some(end)) = (first.timestamp, last.timestamp) {
        writeln!(writer, "Duration: {}", end - start)?;
    }

    let distance = SphericalEarth::default().distance(
        first.sensor_lat,
        first.sensor_lon,
        last.sensor_lat,
        last.sensor_lon,
    );
    writeln!(writer, "Track distance: {:.1} m", distance)?;

    writeln!(writer, "Slant range: {:.1} m", first.slant_range_m)?;
    writeln!(writer, "Ground range: {:.1} m", first.ground_range_m)?;
    if !first.samples.is_empty() {
        let resolution = first.slant_range_m / first.samples.len() as f64 * 100.0;
        writeln!(writer, "Slant range resolution: {:.2} cm/pixel", resolution)?;
    }

    Ok(())
}
