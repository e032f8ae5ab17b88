pub mod analysis;
pub mod inference;
