//! trackgeek: aggregate GPX tracks and draw them onto one map.
//!
//! [`config`] merges the YAML config file with command-line overrides into
//! [`config::Settings`]; [`pipeline::run`] gathers tracks from disk and/or a
//! track store, lays out the canvas and writes PNG/SVG output.

pub mod config;
pub mod pipeline;
