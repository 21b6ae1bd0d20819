// SPDX-License-Identifier: MIT

pub mod identity;
pub mod mail;
pub mod password;
pub mod storage;
pub mod users;

pub use identity::FirebaseAuthClient;
pub use mail::MailgunClient;
pub use password::PasswordService;
pub use storage::StorageService;
pub use users::UserService;
