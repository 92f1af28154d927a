//! Application-wide context.
//!
//! Bundles the repositories and settings a request handler needs so they
//! can be constructed once at startup and shared.

use crate::repository::{HealthCheck, IdeaRepository, TenantRepository, UserRepository};

/// Application-wide settings.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    /// Build timestamp reported by the running binary.
    pub build_time: String,
}

/// Application-wide context.
#[derive(Clone)]
pub struct AppContext<H, T, U, I>
where
    H: HealthCheck,
    T: TenantRepository,
    U: UserRepository,
    I: IdeaRepository,
{
    pub health: H,
    pub tenants: T,
    pub users: U,
    pub ideas: I,
    pub settings: AppSettings,
}
