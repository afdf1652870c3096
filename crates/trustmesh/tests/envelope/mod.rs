/// Envelope tests
pub mod rotation_tests;
pub mod round_trip_tests;
pub mod scenario_tests;
