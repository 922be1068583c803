//! Types of the input grammar
pub mod axis;
pub mod channel;
pub mod config;
pub mod data;
pub mod encoding;
pub mod fielddef;
pub mod header;
pub mod legend;
pub mod mark;
pub mod predicate;
pub mod resolve;
pub mod scale;
pub mod selection;
pub mod spec;
pub mod timeunit;
pub mod transform;
