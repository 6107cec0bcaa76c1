//! HTTP routes

pub mod frames;
pub mod risk;
pub mod sensors;
