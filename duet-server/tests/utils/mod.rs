pub mod link_helpers;

pub use link_helpers::*;
