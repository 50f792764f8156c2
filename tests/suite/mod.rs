mod layout_tests;
mod pattern_tests;
mod property_tests;
