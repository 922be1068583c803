pub mod axis;
pub mod chart;
pub mod data;
pub mod legend;
pub mod mark;
pub mod scale;
pub mod signal;
pub mod title;
pub mod transform;
pub mod values;
pub mod visitors;
