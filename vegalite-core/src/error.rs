pub use vegalite_common::error::*;
