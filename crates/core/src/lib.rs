//! Core library for molsel.
//!
//! A selection language for molecular frames: parse text such as
//! `"pairs: distance(1, 2) < 3.0"` once, then find the atoms, pairs, triples,
//! quadruples, bonds, angles or dihedrals of any frame that satisfy it.
//! Frames are read through the [`frame::FrameView`] trait; an in-memory
//! [`frame::Frame`] with derived angles and dihedrals is provided.

pub mod cancel;
pub mod cell;
pub mod config;
pub mod frame;
pub mod selection;
pub mod util;

pub use cancel::CancellationToken;
pub use config::{EvaluationOptions, SelectionConfig};
pub use frame::{Frame, FrameView};
pub use selection::{select, Context, Match, Selection};
