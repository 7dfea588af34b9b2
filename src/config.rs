use serde::Deserialize;

use crate::platform::Platform;

/// Signing parameters for the session artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Base origins of the satellite applications.
///
/// Either origin may be absent at boot; issuing a handoff against a missing
/// origin is a runtime server fault, never a silent fallback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformUrls {
    pub student: Option<String>,
    pub teacher: Option<String>,
}

impl PlatformUrls {
    pub fn origin(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Student => self.student.as_deref(),
            Platform::Teacher => self.teacher.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub platforms: PlatformUrls,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "schoolgate".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "schoolgate-users".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(8 * 60),
        };
        let platforms = PlatformUrls {
            student: std::env::var("STUDENT_APP_URL").ok(),
            teacher: std::env::var("TEACHER_APP_URL").ok(),
        };
        Ok(Self {
            database_url,
            session,
            platforms,
        })
    }
}
