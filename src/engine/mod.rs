//! # engine
//!
//! The scan pipeline: [`signal`] turns bars into signals, [`scanner`] drives
//! it over the watchlist, [`dispatcher`] delivers what it finds.

pub mod dispatcher;
pub mod scanner;
pub mod signal;
