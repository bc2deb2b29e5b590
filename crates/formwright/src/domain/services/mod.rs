//! Domain services

pub mod derivation;
pub mod formula;
pub mod validator;
