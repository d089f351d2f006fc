pub mod api;

pub mod catalog_registry;
