#[path = "common/mod.rs"]
mod common;

#[path = "integration/command_tests.rs"]
mod command_tests;
#[path = "integration/config_tests.rs"]
mod config_tests;
