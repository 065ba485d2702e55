mod common;
mod jobs_tests;
