// Strike pipeline: decode, normalize, persist, one frame at a time

pub mod decoder;
pub mod driver;
pub mod normalize;

pub use driver::{Driver, DriverState, RunSummary};
pub use normalize::Normalizer;
