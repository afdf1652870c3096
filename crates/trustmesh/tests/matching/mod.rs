/// Matching engine tests
pub mod disclosure_tests;
pub mod score_bounds_tests;
