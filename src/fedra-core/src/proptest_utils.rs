//! Property-based tests for the row and value model.
