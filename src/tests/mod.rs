//! Unit tests

mod test_utils;
mod preprocess_tests;
mod config_tests;
