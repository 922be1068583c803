#[macro_use]
extern crate lazy_static;

pub mod compile;
pub mod error;
pub mod normalize;
pub mod spec;
pub mod vl;

pub use compile::{compile, CompileOptions, CompileOutput};
