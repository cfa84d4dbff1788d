//! Helpers for exploring OOI buoy sensor data: QARTOD quality flags for
//! the SAMI pH and pCO2 sensors, discrete-sample matching, and chart
//! construction for the `ooi-explorer` viewer and `ooi-qc` CLI.

pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod qc;
