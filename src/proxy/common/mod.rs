// Common tools

pub mod domain_filter;
pub mod ssrf;
pub mod utils;
