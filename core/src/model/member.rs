use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::day_record::LoginType;

const DEFAULT_LOGIN_MESSAGE: &str = "Welcome!";
const DEFAULT_LOGOUT_MESSAGE: &str = "Goodbye!";

/// Where a scanned identifier came from. Each source has its own namespace.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Rfid,
    Barcode,
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagType::Rfid => f.write_str("rfid"),
            TagType::Barcode => f.write_str("barcode"),
        }
    }
}

/// A directory entry: the identifiers a member can scan with and their greetings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Member {
    pub tag: String,
    pub barcode: String,
    pub name: String,
    pub login_message: Option<String>,
    pub logout_message: Option<String>,
}

impl Member {
    pub fn new(tag: &str, barcode: &str, name: &str) -> Self {
        Self {
            tag: tag.to_string(),
            barcode: barcode.to_string(),
            name: name.to_string(),
            login_message: None,
            logout_message: None,
        }
    }

    pub fn login_message(&self) -> &str {
        non_blank(&self.login_message).unwrap_or(DEFAULT_LOGIN_MESSAGE)
    }

    pub fn logout_message(&self) -> &str {
        non_blank(&self.logout_message).unwrap_or(DEFAULT_LOGOUT_MESSAGE)
    }

    /// Feedback shown to the member after a scan was classified.
    pub fn greeting(&self, login_type: LoginType) -> String {
        match login_type {
            LoginType::Login => format!("{} {}", self.login_message(), self.name),
            LoginType::Logout => format!("{} {}", self.logout_message(), self.name),
            LoginType::InvalidTimeSpan => format!(
                "{}: logout does not match your login, please see a mentor",
                self.name
            ),
        }
    }
}

fn non_blank(message: &Option<String>) -> Option<&str> {
    message.as_deref().map(str::trim).filter(|m| !m.is_empty())
}
