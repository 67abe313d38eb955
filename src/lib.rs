#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub mod annotate;
pub mod container;
pub mod convert;
pub mod error;
pub mod geo;
pub mod gpx;
pub mod kml;
pub mod logs;
mod xml;
