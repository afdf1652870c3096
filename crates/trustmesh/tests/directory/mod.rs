/// Key directory and registry tests
pub mod availability_tests;
pub mod registration_tests;
