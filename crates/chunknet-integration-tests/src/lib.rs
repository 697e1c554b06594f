//! Integration test crate for the Chunknet oracle client.
//!
//! This crate has no library code; it only contains integration tests
//! that drive [`chunknet_oracle::OracleClient`] against the in-memory
//! contract simulator from `chunknet-mock`.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p chunknet-integration-tests
//! ```
