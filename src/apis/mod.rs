pub mod base;
pub mod factory;

pub mod brooklyn_library;
pub mod brooklyn_paper;
pub mod eventbrite;
pub mod nyc_sample;
pub mod wagmag;
