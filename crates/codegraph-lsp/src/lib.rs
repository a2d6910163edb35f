//! # codegraph-lsp
//!
//! JSON-RPC stdio language-server client: subprocess
//! spawn and handshake, an auto-restarting lifecycle manager, and a hover
//! text parser that recovers signatures/return types/parameter types for
//! nodes the AST alone cannot type.

pub mod client;
pub mod error;
pub mod lifecycle;
pub mod type_extractor;
pub mod wire;

pub use client::{language_id, LanguageServerKind, LspClient};
pub use error::LspError;
pub use lifecycle::{Health, HealthStatus, LspLifecycleManager};
pub use type_extractor::{parse_hover_signature, parse_parameters, split_params, TypeExtractor, TypeInfo};
