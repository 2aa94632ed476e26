//! Integration tests for the macro environment store

mod concurrency;
mod notification;
mod persistence;
mod test_utils;
