pub mod aggregate;
pub mod bin;
pub mod extent;
pub mod filter;
pub mod flatten;
pub mod fold;
pub mod formula;
pub mod identifier;
pub mod lookup;
pub mod stack;

use crate::spec::transform::aggregate::AggregateTransformSpec;
use crate::spec::transform::bin::BinTransformSpec;
use crate::spec::transform::extent::ExtentTransformSpec;
use crate::spec::transform::filter::FilterTransformSpec;
use crate::spec::transform::flatten::FlattenTransformSpec;
use crate::spec::transform::fold::FoldTransformSpec;
use crate::spec::transform::formula::FormulaTransformSpec;
use crate::spec::transform::identifier::IdentifierTransformSpec;
use crate::spec::transform::lookup::LookupTransformSpec;
use crate::spec::transform::stack::StackTransformSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformSpec {
    Extent(ExtentTransformSpec),
    Filter(FilterTransformSpec),
    Formula(FormulaTransformSpec),
    Bin(Box<BinTransformSpec>), // Box since transform is much larger than others
    Aggregate(AggregateTransformSpec),
    Identifier(IdentifierTransformSpec),
    Lookup(LookupTransformSpec),
    Flatten(FlattenTransformSpec),
    Fold(FoldTransformSpec),
    Stack(StackTransformSpec),
}
