//! Synthetic XTF files for tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// A sonar channel described in the file header
pub struct ChanSpec {
    pub type_code: u8,
    pub bytes_per_sample: u16,
    pub name: &'static str,
}

/// One sidescan ping
pub struct PingSpec {
    pub ping_number: u32,
    pub lat: f64,
    pub lon: f64,
    pub heading: f32,
    pub slant_range: f32,
    pub ground_range: f32,
    pub month: u8,
    pub hseconds: u8,
    pub samples: Vec<u32>,
}

/// A synthetic XTF file
pub struct XtfBuilder {
    pub nav_units: u16,
    pub channels: Vec<ChanSpec>,
    pub pings: Vec<PingSpec>,
    pub annotation_packets: usize,
}

fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_f32(buf: &mut [u8], at: usize, v: f32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_f64(buf: &mut [u8], at: usize, v: f64) {
    buf[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

impl XtfBuilder {
    /// A single channel file with `pings` pings of `samples` samples
    ///
    /// The sensor heads north at roughly 1 m per ping.
    pub fn single(type_code: u8, pings: u32, samples: u32) -> XtfBuilder {
        let pings = (0..pings)
            .map(|i| PingSpec {
                ping_number: 1000 + i,
                lat: 63.4 + f64::from(i) * 1e-5,
                lon: 10.4,
                heading: 0.0,
                slant_range: 52.0,
                ground_range: 50.0,
                month: 5,
                hseconds: 50,
                samples: (0..samples)
                    .map(|s| 20 + (s * 37 + i * 11) % 3000)
                    .collect(),
            })
            .collect();
        XtfBuilder {
            nav_units: 3,
            channels: vec![ChanSpec {
                type_code,
                bytes_per_sample: 2,
                name: if type_code == 1 { "Port" } else { "Starboard" },
            }],
            pings,
            annotation_packets: 1,
        }
    }

    fn header(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 1024];
        buf[0] = 0x7b;
        buf[18..18 + 6].copy_from_slice(b"Synth\0");
        put_u16(&mut buf, 164, self.nav_units);
        put_u16(&mut buf, 166, self.channels.len() as u16);
        for (i, chan) in self.channels.iter().enumerate() {
            let at = 256 + 128 * i;
            buf[at] = chan.type_code;
            put_u16(&mut buf, at + 6, chan.bytes_per_sample);
            let name = chan.name.as_bytes();
            buf[at + 12..at + 12 + name.len()].copy_from_slice(name);
        }
        buf
    }

    fn ping(&self, ping: &PingSpec, seconds: u32) -> Vec<u8> {
        let bytes_per_sample = usize::from(self.channels[0].bytes_per_sample);
        let chans = self.channels.len();
        let size = 256 + chans * (64 + ping.samples.len() * bytes_per_sample);
        let mut buf = vec![0u8; size];

        put_u16(&mut buf, 0, 0xface);
        buf[2] = 0;
        put_u16(&mut buf, 4, chans as u16);
        put_u32(&mut buf, 10, size as u32);
        put_u16(&mut buf, 14, 2015);
        buf[16] = ping.month;
        buf[17] = 28;
        buf[18] = 17;
        buf[19] = (26 + seconds / 60) as u8;
        buf[20] = (seconds % 60) as u8;
        buf[21] = ping.hseconds;
        put_u32(&mut buf, 28, ping.ping_number);
        put_f64(&mut buf, 160, ping.lat);
        put_f64(&mut buf, 168, ping.lon);
        put_f32(&mut buf, 212, ping.heading);

        let mut at = 256;
        for c in 0..chans {
            put_u16(&mut buf, at, c as u16);
            put_f32(&mut buf, at + 4, ping.slant_range);
            put_f32(&mut buf, at + 8, ping.ground_range);
            put_u32(&mut buf, at + 42, ping.samples.len() as u32);
            at += 64;
            for &s in &ping.samples {
                match bytes_per_sample {
                    1 => buf[at] = s as u8,
                    2 => put_u16(&mut buf, at, s as u16),
                    _ => put_u32(&mut buf, at, s),
                }
                at += bytes_per_sample;
            }
        }
        buf
    }

    fn annotation(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 64];
        put_u16(&mut buf, 0, 0xface);
        buf[2] = 1;
        put_u32(&mut buf, 10, 64);
        buf
    }

    /// The bytes of the file
    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header();
        for _ in 0..self.annotation_packets {
            out.extend(self.annotation());
        }
        for (i, ping) in self.pings.iter().enumerate() {
            out.extend(self.ping(ping, i as u32));
        }
        out
    }

    /// Write the file into `dir`
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}
