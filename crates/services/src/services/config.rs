use std::path::PathBuf;

use utils::jwt::JwtConfig;

/// Settings shared by the services, built once from the server configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// bcrypt cost used when hashing passwords
    pub password_cost: u32,
    pub jwt: JwtConfig,
    pub report_output_dir: PathBuf,
}
