pub mod predict;
pub mod strike;
