pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::Config;

pub mod filter;

pub mod repository;
pub use repository::Repository;
pub use repository::Resource;

pub mod relationship_resolver;
pub use relationship_resolver::Resolver;
pub use relationship_resolver::ResolveFlags;

pub mod deployment;
