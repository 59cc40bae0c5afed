#![warn(missing_docs)]
//! Georeferencing sidescan sonar data
//!
//! Single channel XTF files are turned into an 8 or 16 bit intensity
//! raster, positioned in WGS 84 coordinates from the navigation of the
//! first and last ping using a spherical Earth model, and written out as
//! an image with world file and auxiliary XML sidecars plus a GeoTIFF.
pub mod algorithms;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
