//! Test module organization.
//!
//! This module organizes all integration tests for the simulator console.


/// Address width and identifier type tests.
mod common_tests;



/// File-drop transport and engine supervisor tests.
mod file_drop_tests;

/// Address-width migration tests.
mod migration_tests;




/// Settings validation and settings store tests.
mod settings_tests;


/// Results document parsing and summary tests.
mod stats_tests;
