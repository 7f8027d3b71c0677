pub mod corpus;
pub mod ir;
pub mod location;

pub use corpus::{Corpus, CorpusGroup, TranslationUnit};
pub use ir::*;
pub use location::{ExpandedLocation, Location, LocationManager};
