pub mod bbox;
pub mod labels;
pub mod normalize;

pub use normalize::normalize;
