//! InkCalc: sketch a math expression on a canvas, send it to an evaluation
//! service, and see the answers drawn where the ink was.

pub mod logger;

pub mod app;
pub mod calculate;
pub mod canvas;
pub mod cli;
pub mod config;
pub mod error;
pub mod overlay;
pub mod palette;
pub mod session;
