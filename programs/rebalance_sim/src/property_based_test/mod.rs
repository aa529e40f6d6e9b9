pub mod simulator_property_tests;
