//! Unit tests for individual components

mod common;
mod unit;
