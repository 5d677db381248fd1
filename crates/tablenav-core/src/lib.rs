// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod config;
pub mod document;
pub mod navigator;
pub mod selector;
pub mod tree;

pub use config::*;
pub use document::*;
pub use navigator::*;
pub use selector::*;
pub use tree::*;
