// ABOUTME: External service clients
// ABOUTME: The Analysis Service contract and its HTTP implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! External API Clients

pub mod analysis_service;

pub use analysis_service::{
    AnalysisService, AnalyzeRequest, ApiCredential, ChatRole, ChatTurn, DetailedChatRequest,
    HttpAnalysisService,
};
