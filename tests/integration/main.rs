//! Headless integration tests for the full gameplay stack.

mod simulation;
