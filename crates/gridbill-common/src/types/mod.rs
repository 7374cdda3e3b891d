//! Core data types for the Gridbill tariff engine

pub mod source;
