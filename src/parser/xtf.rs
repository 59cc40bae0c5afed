//! Parsing XTF files
use crate::error::{Error, Result};
use crate::model::{self, Channel, ChannelInfo, NavUnits, PingRecord, Side};
use binrw::{binread, BinRead, BinResult};
use log::{debug, info, warn};
use std::io;
use time::{Date, Month, OffsetDateTime, Time};

fn fixed_string(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// The XTFFileHeader
#[binread]
#[br(little, magic = b"\x7b")]
#[derive(Debug, PartialEq)]
pub struct FileHeader {
    system_type: u8,
    #[br(count = 8, map = fixed_string)]
    recording_program_name: String,
    #[br(count = 8, map = fixed_string)]
    recording_program_version: String,
    #[br(count = 16, map = fixed_string)]
    sonar_name: String,
    sensors_type: u16,
    #[br(count = 64, map = fixed_string)]
    note_string: String,
    #[br(count = 64, map = fixed_string)]
    file_name: String,
    nav_units: u16,
    number_of_sonar_channels: u16,
    number_of_bathy_channels: u16,
    number_of_snippet_channels: u8,
    number_of_forward_look_arrays: u8,
    number_of_echo_strength_channels: u16,
    #[br(pad_after = 3)]
    number_of_interferometry_channels: u8,
    reference_point_height: f32,
    #[br(count = 12)]
    projection_type: Vec<u8>,
    #[br(count = 10)]
    spheroid_type: Vec<u8>,
    navigation_latency: i32,
    origin_y: f32,
    origin_x: f32,
    nav_offset_y: f32,
    nav_offset_x: f32,
    nav_offset_z: f32,
    nav_offset_yaw: f32,
    mru_offset_y: f32,
    mru_offset_x: f32,
    mru_offset_z: f32,
    mru_offset_yaw: f32,
    mru_offset_pitch: f32,
    mru_offset_roll: f32,
    #[br(count = 6)]
    chaninfos: Vec<ChanInfo>,
}

impl FileHeader {
    /// The name of the sonar system that recorded the file
    pub fn sonar_name(&self) -> &str {
        &self.sonar_name
    }

    /// The number of sidescan channels in the file
    pub fn sonar_channel_count(&self) -> u16 {
        self.number_of_sonar_channels
    }

    /// The channel descriptions actually in use
    pub fn sonar_chaninfos(&self) -> &[ChanInfo] {
        let n = usize::from(self.number_of_sonar_channels).min(self.chaninfos.len());
        &self.chaninfos[..n]
    }

    /// Convert to the model header, validating the side of every channel
    pub fn to_model(&self) -> Result<model::FileHeader> {
        let channels = self
            .sonar_chaninfos()
            .iter()
            .map(|c| {
                Ok(ChannelInfo {
                    side: c.side()?,
                    name: c.channel_name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(model::FileHeader {
            nav_units: NavUnits::from(self.nav_units),
            channel_count: self.number_of_sonar_channels,
            channels,
        })
    }
}

/// The ChanInfo struct
#[binread]
#[br(little)]
#[derive(Debug, PartialEq)]
pub struct ChanInfo {
    type_of_channel: u8,
    sub_channel_number: u8,
    correction_flags: u16,
    unipolar: u16,
    #[br(pad_after = 4)]
    bytes_per_sample: u16,
    #[br(count = 16, map = fixed_string)]
    channel_name: String,
    volt_scale: f32,
    frequency: f32,
    horizontal_beam_angle: f32,
    tilt_angle: f32,
    beam_width: f32,
    offset_x: f32,
    offset_y: f32,
    offset_z: f32,
    offset_yaw: f32,
    offset_pitch: f32,
    offset_roll: f32,
    beams_per_array: u16,
    #[br(pad_after = 53)]
    sample_format: u8,
}

impl ChanInfo {
    /// The side imaged by this channel
    ///
    /// The side is taken from the channel type code. Channel names
    /// vary between acquisition systems and are not consulted.
    pub fn side(&self) -> Result<Side> {
        match self.type_of_channel {
            1 => Ok(Side::Port),
            2 => Ok(Side::Starboard),
            code => Err(Error::UnsupportedConfiguration(format!(
                "channel '{}' has type {} which is neither port (1) nor starboard (2)",
                self.channel_name, code
            ))),
        }
    }

    /// The number of bytes in each sample of this channel
    pub fn bytes_per_sample(&self) -> u16 {
        self.bytes_per_sample
    }
}

/// A directory of packet types
#[binread]
#[br(little, import {header_type: u8, num_chans_to_follow: u16, bytes_per_sample: u16})]
#[derive(Debug, PartialEq)]
pub enum PacketType {
    /// A packet for sidescan sonar data
    #[br(pre_assert(header_type==0))]
    Sonar(#[br(args {num_chans_to_follow, bytes_per_sample} )] PingHeader),
    /// An unknown packet type.
    ///
    /// This is used as a fallback if no other packet succeeds
    Unknown,
}

/// An XTF data packet
///
/// This assumes that all packets start with fields that
/// describe the header type, channel number, number of channels,
/// and number of bytes in the packet, which all of the documented
/// packet types do. Manufacturer-specific packets may not follow
/// this structure, and parsing will fail for such packets.
#[binread]
#[br(little, magic = 64206u16, import {bytes_per_sample: u16})]
#[derive(Debug, PartialEq)]
pub struct Packet {
    header_type: u8,
    sub_channel_number: u8,
    #[br(pad_after = 4)]
    num_chans_to_follow: u16,
    #[br(assert(num_bytes_this_record >= 14, "record size {} is too small", num_bytes_this_record))]
    num_bytes_this_record: u32,
    #[br(args {header_type, num_chans_to_follow, bytes_per_sample},pad_size_to=num_bytes_this_record-14)]
    header: PacketType,
}

impl Packet {
    /// Return the name of the packet type
    pub fn packet_name(&self) -> String {
        match self.header {
            PacketType::Sonar(_) => "Sonar".to_string(),
            PacketType::Unknown => "Unknown".to_string(),
        }
    }

    /// The sonar ping carried by this packet, if any
    pub fn ping(&self) -> Option<&PingHeader> {
        match &self.header {
            PacketType::Sonar(ping) => Some(ping),
            PacketType::Unknown => None,
        }
    }
}

/// A header describing ping-specific information
///
/// Timing and navigation information is contained here. The
/// data for the ping are stored in a Vec<PingChanHeader> with
/// one element for each channel.
#[binread]
#[br(little,import {num_chans_to_follow: u16, bytes_per_sample: u16})]
#[derive(Debug, PartialEq)]
pub struct PingHeader {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    hseconds: u8,
    julian_day: u16,
    event_number: u32,
    ping_number: u32,
    sound_velocity: f32,
    #[br(pad_after = 4)]
    ocean_tide: f32,
    conductivity_freq: f32,
    temperature_freq: f32,
    pressure_freq: f32,
    pressure_temp: f32,
    conductivity: f32,
    water_temperature: f32,
    pressure: f32,
    computed_sound_velocity: f32,
    mag_x: f32,
    mag_y: f32,
    mag_z: f32,
    aux_val1: f32,
    aux_val2: f32,
    #[br(pad_after = 12)]
    aux_val3: f32,
    speed_log: f32,
    turbidity: f32,
    ship_speed: f32,
    ship_gyro: f32,
    ship_y_coordinate: f64,
    ship_x_coordinate: f64,
    ship_altitude: u16,
    ship_depth: u16,
    fix_time_hour: u8,
    fix_time_minute: u8,
    fix_time_second: u8,
    fix_time_hsecond: u8,
    sensor_speed: f32,
    kilometers_pipe: f32,
    sensor_y_coordinate: f64,
    sensor_x_coordinate: f64,
    sonar_status: u16,
    range_to_fish: u16,
    bearing_to_fish: u16,
    cable_out: u16,
    layback: f32,
    cable_tension: f32,
    sensor_depth: f32,
    sensor_primary_altitude: f32,
    sensor_aux_altitude: f32,
    sensor_pitch: f32,
    sensor_roll: f32,
    sensor_heading: f32,
    heave: f32,
    yaw: f32,
    attitude_time_tag: u32,
    dot: f32,
    nav_fix_milliseconds: u32,
    computer_clock_hour: u8,
    computer_clock_minute: u8,
    computer_clock_second: u8,
    computer_clock_hsec: u8,
    fish_position_delta_x: i16,
    fish_position_delta_y: i16,
    fish_position_error_code: u8,
    optional_offset: u32,
    #[br(pad_after = 6)]
    cable_out_hundredths: u8,
    #[br(args { count: num_chans_to_follow.into(), inner: binrw::args! { bytes_per_sample } })]
    channel_data: Vec<PingChanHeader>,
}

impl PingHeader {
    /// The time of the ping
    pub fn timestamp(&self) -> Result<OffsetDateTime> {
        let month = Month::try_from(self.month)
            .map_err(|e| Error::InputFormat(format!("ping {}: {}", self.ping_number, e)))?;
        let date = Date::from_calendar_date(i32::from(self.year), month, self.day)
            .map_err(|e| Error::InputFormat(format!("ping {}: {}", self.ping_number, e)))?;
        let time = Time::from_hms_milli(
            self.hour,
            self.minute,
            self.second,
            u16::from(self.hseconds) * 10,
        )
        .map_err(|e| Error::InputFormat(format!("ping {}: {}", self.ping_number, e)))?;
        Ok(date.with_time(time).assume_utc())
    }

    /// Convert the first channel of the ping into a PingRecord
    pub fn to_record(&self) -> Result<PingRecord> {
        let chan = self.channel_data.first().ok_or_else(|| {
            Error::InputFormat(format!("ping {} carries no channel data", self.ping_number))
        })?;

        let timestamp = match self.timestamp() {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("Ignoring acquisition time: {}", e);
                None
            }
        };

        Ok(PingRecord {
            ping_number: self.ping_number,
            timestamp,
            sensor_lat: self.sensor_y_coordinate,
            sensor_lon: self.sensor_x_coordinate,
            heading_deg: f64::from(self.sensor_heading),
            slant_range_m: f64::from(chan.slant_range),
            ground_range_m: f64::from(chan.ground_range),
            samples: chan.data.to_vec(),
        })
    }
}

/// A header describing ping- and channel-specific information
///
/// The actual sonar return data are stored as a SonarData wrapper
/// in the data field.
#[binread]
#[br(little, import {bytes_per_sample: u16})]
#[derive(Debug, PartialEq)]
pub struct PingChanHeader {
    channel_number: u16,
    downsample_method: u16,
    slant_range: f32,
    ground_range: f32,
    time_delay: f32,
    time_duration: f32,
    seconds_per_ping: f32,
    processing_flags: u16,
    frequency: u16,
    initial_gain_code: u16,
    gain_code: u16,
    bandwidth: u16,
    contact_number: u32,
    contact_classification: u16,
    contact_sub_number: u8,
    contact_type: u8,
    num_samples: u32,
    millivolt_scale: u16,
    contact_time_off_track: f32,
    #[br(pad_after = 1)]
    contact_close_number: u8,
    fixed_vsop: f32,
    #[br(pad_after = 4)]
    weight: i16,
    #[br(args {bytes_per_sample, num_samples})]
    data: SonarData,
}

#[binread]
#[br(little, import {bytes_per_sample: u16, num_samples: u32})]
#[derive(Debug, PartialEq)]
/// An enum to dispatch different sonar data types
///
/// The sample width is taken from the ChanInfo of the channel.
pub enum SonarData {
    /// 8 bit sonar data
    #[br(pre_assert(bytes_per_sample==1))]
    U8(#[br(count=num_samples)] Vec<u8>),
    /// 16 bit sonar data
    #[br(pre_assert(bytes_per_sample==2))]
    U16(#[br(count=num_samples)] Vec<u16>),
    /// 32 bit sonar data
    #[br(pre_assert(bytes_per_sample==4))]
    U32(#[br(count=num_samples)] Vec<u32>),
}

impl SonarData {
    /// Widen the samples to u32
    pub fn to_vec(&self) -> Vec<u32> {
        match self {
            SonarData::U8(v) => v.iter().map(|&x| u32::from(x)).collect(),
            SonarData::U16(v) => v.iter().map(|&x| u32::from(x)).collect(),
            SonarData::U32(v) => v.clone(),
        }
    }
}

/// A representation of an XTF file on disk
pub struct File<T>
where
    T: io::Read + io::Seek,
{
    header: FileHeader,
    bytes_per_sample: u16,
    reader: T,
}

impl<T> File<T>
where
    T: io::Read + io::Seek,
{
    /// Create an XTF file from a reader
    ///
    /// # Errors
    ///
    /// Returns an error if the file header cannot be parsed
    pub fn new(mut reader: T) -> BinResult<Self> {
        let header = FileHeader::read(&mut reader)?;
        let bytes_per_sample = header
            .sonar_chaninfos()
            .first()
            .map(|c| c.bytes_per_sample)
            .unwrap_or(2);
        Ok(File {
            header,
            bytes_per_sample,
            reader,
        })
    }

    /// Return a reference to the FileHeader
    pub fn header(&self) -> &FileHeader {
        &self.header
    }
}

impl<T: io::Read + io::Seek> Iterator for File<T> {
    type Item = BinResult<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        let res = Packet::read_args(
            &mut self.reader,
            binrw::args! { bytes_per_sample: self.bytes_per_sample },
        );
        match res {
            Ok(msg) => Some(Ok(msg)),
            Err(e) => {
                if e.is_eof() {
                    None
                } else {
                    Some(Err(e))
                }
            }
        }
    }
}

/// Read the header and the pings of the first sonar channel of an XTF file
///
/// No check is made that the file describes a single channel; use
/// [`read_channel`] for that.
///
/// # Errors
///
/// Fails with [`Error::InputFormat`] if the file cannot be parsed.
pub fn read_pings<T: io::Read + io::Seek>(
    reader: T,
) -> Result<(model::FileHeader, Vec<PingRecord>)> {
    let file = File::new(reader)?;
    let header = file.header().to_model()?;
    debug!("XTF header: {:?}", header);

    let mut pings = Vec::new();
    let mut unknown = 0usize;
    for packet in file {
        let packet = packet?;
        match packet.ping() {
            Some(ping) => pings.push(ping.to_record()?),
            None => unknown += 1,
        }
    }
    debug!("Skipped {} non-sonar packets", unknown);

    Ok((header, pings))
}

/// Read the single sidescan channel of an XTF file
///
/// # Errors
///
/// Fails with [`Error::UnsupportedConfiguration`] if the file has more
/// than one sonar channel, if the navigation is not in degrees or if the
/// channel is neither port nor starboard. Fails with [`Error::InputFormat`]
/// if the file cannot be parsed or holds no sonar pings.
pub fn read_channel<T: io::Read + io::Seek>(reader: T) -> Result<(model::FileHeader, Channel)> {
    let (header, pings) = read_pings(reader)?;

    if header.channel_count != 1 {
        return Err(Error::UnsupportedConfiguration(format!(
            "only single channel files are supported, found {} sonar channels",
            header.channel_count
        )));
    }

    if header.nav_units != NavUnits::Degrees {
        return Err(Error::UnsupportedConfiguration(format!(
            "navigation units {:?} are not supported, coordinates must be in degrees",
            header.nav_units
        )));
    }

    if pings.is_empty() {
        return Err(Error::InputFormat(
            "missing sonar section, the file has no sonar pings".to_string(),
        ));
    }

    let side = header.channels[0].side;
    info!(
        "Read {} pings from channel '{}' ({})",
        pings.len(),
        header.channels[0].name,
        side
    );

    Ok((header, Channel::new(side, pings)))
}
