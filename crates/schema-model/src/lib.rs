//! Layercut Schema Model
//!
//! Defines what an export run should do:
//! - **Model:** The declarative YAML schema file, validated for shape only
//! - **Resolution:** The strict `Schema → Document → Export → Group` tree
//!   with lazy, lexical inheritance of action/mask/resize defaults
//! - **Geometry:** Pixel rectangles, bounding boxes, and resize planning
//!
//! This crate is pure data and computation apart from reading the schema
//! file itself.

pub mod build;
pub mod error;
pub mod geometry;
pub mod model;
pub mod resolve;

pub use build::*;
pub use error::*;
pub use geometry::*;
pub use model::*;
pub use resolve::*;
