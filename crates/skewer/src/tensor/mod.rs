pub mod constant;
pub(crate) mod operations;
