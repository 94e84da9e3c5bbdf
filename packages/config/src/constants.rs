// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Lectern

// Database Configuration
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const LECTERN_DB_MAX_CONNECTIONS: &str = "LECTERN_DB_MAX_CONNECTIONS";

// Runtime Environment
pub const ENV: &str = "ENV"; // "development" or "production"
