// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The signed-in author.

use serde::{Deserialize, Serialize};

/// Identity of the author as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub uid: String,
    pub email: String,
    pub username: String,
}

impl UserSession {
    /// Username falls back to the local part of the email address.
    pub fn new(uid: impl Into<String>, email: impl Into<String>, username: Option<String>) -> Self {
        let email = email.into();
        let username = username
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        Self {
            uid: uid.into(),
            email,
            username,
        }
    }
}
