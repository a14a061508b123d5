pub mod bind;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod field;
pub mod fill;
pub mod form;
pub mod mapping;
pub mod memory;
pub mod path;
pub mod propagate;
pub mod security;
pub mod types;
pub mod validation;
pub mod value;

#[cfg(test)]
pub(crate) mod fixtures;
