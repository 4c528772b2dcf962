//! The library code for the `wolfdog` static site generator. A site is a
//! directory holding a `wolfdog.json` manifest, a posts directory of
//! content/metadata pairs, templates, and static assets. Building it is a
//! strictly sequential pipeline:
//!
//! 1. Loading and version-checking the manifest ([`crate::config`])
//! 2. Checking that every configured path stays inside the project and out
//!    of the output directory ([`crate::guard`])
//! 3. Copying static assets
//! 4. Assembling the post corpus ([`crate::parser`], [`crate::post`])
//! 5. Registering partials ([`crate::partials`])
//! 6. Rendering posts ([`crate::write`]) against scopes built by
//!    [`crate::value`]
//! 7. Rendering the additional pages tree ([`crate::pages`])
//!
//! [`crate::build`] runs the whole thing.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod guard;
pub mod pages;
pub mod parser;
pub mod partials;
pub mod post;
pub mod value;
pub mod write;

mod util;
