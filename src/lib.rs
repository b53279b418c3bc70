//! esmify - Converts CommonJS source trees to ES modules.
//!
//! Copies a project's source directories into a parallel output tree,
//! renames files to the target extension, delegates the require/exports
//! conversion to an external codemod engine, rewrites import/export
//! specifiers so they resolve on disk, and patches the project manifest
//! with the converted entry point.

pub mod cli;
pub mod codemod;
pub mod collector;
pub mod config;
pub mod copier;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod resolver;
pub mod rewrite;
pub mod shebang;
pub mod statement;
