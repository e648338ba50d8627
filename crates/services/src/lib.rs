//! Backend services for the CMS: the AI theme-synthesis pipeline.

pub mod services;
