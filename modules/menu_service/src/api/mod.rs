//! In-process API surface

pub mod native;
