// ABOUTME: Shared test helpers and utilities for integration tests
// ABOUTME: Exports the HTTP request driver and the in-memory test server fixture
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod axum_test;
pub mod test_server;
