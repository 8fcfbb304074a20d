pub mod analysis;
pub mod interview;
