//! Domain Layer
//!
//! Entities, value objects and ports. No I/O lives here.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;
