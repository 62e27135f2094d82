pub mod result;
pub mod reward;
