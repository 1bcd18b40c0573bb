pub mod attachment;
pub mod constants;
pub mod validation;
