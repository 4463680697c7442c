//! Geometry query kernel for Monte Carlo particle transport.
//!
//! Every geometry answers three questions for a particle at a position:
//! which region it is in ([`geometry::Geometry::is_where`]), how far it can
//! travel along a direction before crossing a boundary
//! ([`geometry::Geometry::howfar`]) and a safe lower bound on the distance to
//! the nearest boundary ([`geometry::Geometry::hownear`]).
//!
//! # Key Components
//! - [`geometry`]: the query contract and the closed set of geometry variants.
//! - [`union`], [`repeater`]: composite geometries that delegate to shared children.
//! - [`iplanes`], [`prism`], [`pyramid`], [`spheres`]: analytic primitives.
//! - [`triangle_mesh`], [`tet_mesh`]: unstructured surface and volume meshes.
//! - [`tetgen`], [`stl`]: mesh file readers.
//! - [`factory`]: builds geometries from TOML definitions.
//! - [`tester`]: random consistency checks and ray tracing used by the `egs-geom` binary.

pub mod error;
pub mod factory;
pub mod geometry;
pub mod input;
pub mod iplanes;
pub mod media;
pub mod neighbours;
pub mod polygon;
pub mod prism;
pub mod projector;
pub mod pyramid;
pub mod registry;
pub mod repeater;
pub mod settings;
pub mod spheres;
pub mod stl;
pub mod tester;
pub mod tet_mesh;
pub mod tetgen;
pub mod transform;
pub mod triangle_mesh;
pub mod union;
