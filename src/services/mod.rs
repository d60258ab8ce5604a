pub mod auth;
pub mod management;
pub mod session;
