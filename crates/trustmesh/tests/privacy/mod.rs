/// Privacy filter tests
pub mod monotonicity_tests;
pub mod settings_api_tests;
