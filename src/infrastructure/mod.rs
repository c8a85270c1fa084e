// Infrastructure layer - External dependencies and adapters
pub mod avwx_source;
pub mod config;
pub mod demo_source;
pub mod icon_catalog;
