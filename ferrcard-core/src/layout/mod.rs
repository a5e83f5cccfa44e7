pub mod detection;
pub mod element;
