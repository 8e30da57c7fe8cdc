// Library for tests to access modules

pub mod broadcaster;
pub mod config;
pub mod executor;
pub mod models;
pub mod routes;
pub mod sysinfo_repo;
pub mod version;
pub mod worker;
