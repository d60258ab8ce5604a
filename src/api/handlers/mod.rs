pub mod health;
pub mod mcp;
pub mod well_known;
