use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two satellite platforms a user can belong to.
///
/// The same value set doubles as the user's stored role: a student account
/// may only be handed off to the student platform, and likewise for
/// teachers. Serialized lowercase everywhere (wire bodies and the database).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Student,
    Teacher,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Student => "student",
            Platform::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown platform string. The boundary maps this to a 400-class error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlatform(pub String);

impl fmt::Display for UnknownPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown platform: {}", self.0)
    }
}

impl std::error::Error for UnknownPlatform {}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Platform::Student),
            "teacher" => Ok(Platform::Teacher),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}
