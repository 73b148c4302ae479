//! Binary-level tests: whole-map scenarios through the public library API,
//! plus command-line parsing.

mod cli_tests;
