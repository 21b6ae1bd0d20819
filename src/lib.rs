// SPDX-License-Identifier: MIT

//! Plek backend: user and credential lifecycle API.
//!
//! This crate provides the backend API for user account management
//! (Firestore profile documents plus Firebase Auth credentials) and the
//! email-based password reset workflow.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

use config::Config;
use db::FirestoreDb;
use services::{FirebaseAuthClient, PasswordService, UserService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub auth: FirebaseAuthClient,
    pub user_service: UserService,
    pub password_service: PasswordService,
}
