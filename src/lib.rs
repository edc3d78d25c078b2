pub mod api;
pub mod config;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;
