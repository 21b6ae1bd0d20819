// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod password_reset;
pub mod user;

pub use password_reset::PasswordReset;
pub use user::User;
