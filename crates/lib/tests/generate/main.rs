mod build_tests;
mod source_tests;
