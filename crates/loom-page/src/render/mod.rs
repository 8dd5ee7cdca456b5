// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The render command abstraction and the queue that drains it.
//!
//! Rendering is an explicit stack machine rather than a recursive walk. A
//! [`RenderCommand`] does a small amount of output and then pushes whatever
//! must happen next onto the [`RenderQueue`](queue::RenderQueue). Because the
//! queue is a stack, a command that needs `a` then `b` to run pushes `b`
//! first.

pub mod commands;
pub(crate) mod phases;
pub mod queue;

use crate::error::RenderError;
use crate::page::Page;
use loom_core::MarkupWriter;
use queue::RenderQueue;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// RenderContext: what a command sees while it runs
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a render command may touch while it executes.
pub struct RenderContext<'a> {
    /// The page being rendered.
    pub page: &'a Page,
    /// Destination for markup.
    pub writer: &'a mut dyn MarkupWriter,
    /// The queue to push follow-up commands onto.
    pub queue: &'a mut RenderQueue,
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderCommand
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of work in the render queue.
///
/// Commands are shared between threads (they are part of the page
/// structure) and must therefore keep any per-render state out of `self`.
/// The `Debug` form names the command in render traces and errors.
pub trait RenderCommand: fmt::Debug + Send + Sync {
    /// Executes the command.
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError>;
}
