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

//! Template commands: the static pieces a template is made of.
//!
//! A compiled template is a flat list of these commands interleaved with
//! the commands of embedded components ([`Page::element_command`]).
//!
//! [`Page::element_command`]: crate::Page::element_command

use super::{RenderCommand, RenderContext};
use crate::binding::Binding;
use crate::component::Renderable;
use crate::error::RenderError;
use crate::page::ElementId;
use loom_core::Location;
use std::fmt;
use std::sync::Arc;

/// Opens an element with fixed attributes.
pub fn start_element(name: &str, attributes: &[(&str, &str)]) -> Arc<dyn RenderCommand> {
    Arc::new(StartElement {
        name: name.to_string(),
        attributes: attributes
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    })
}

/// Closes the current element.
pub fn end_element() -> Arc<dyn RenderCommand> {
    Arc::new(EndElement)
}

/// Writes escaped text.
pub fn text(text: &str) -> Arc<dyn RenderCommand> {
    Arc::new(Text(text.to_string()))
}

/// Writes markup verbatim.
pub fn raw(markup: &str) -> Arc<dyn RenderCommand> {
    Arc::new(Raw(markup.to_string()))
}

/// Writes a comment.
pub fn comment(text: &str) -> Arc<dyn RenderCommand> {
    Arc::new(Comment(text.to_string()))
}

/// Writes the current value of a binding as text (`${...}` in a template).
/// A null value writes nothing.
pub fn expansion(binding: Arc<dyn Binding>) -> Arc<dyn RenderCommand> {
    Arc::new(Expansion { binding })
}

/// Renders the body of `element` where its template says so (`<t:body/>`).
pub fn render_body(element: ElementId) -> Arc<dyn RenderCommand> {
    Arc::new(RenderBody { element })
}

/// Wraps a [`Renderable`] as a command.
pub fn renderable(renderable: Arc<dyn Renderable>) -> Arc<dyn RenderCommand> {
    Arc::new(RenderableCommand(renderable))
}

struct StartElement {
    name: String,
    attributes: Vec<(String, String)>,
}

impl fmt::Debug for StartElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Start[{}]", self.name)
    }
}

impl RenderCommand for StartElement {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        let attributes: Vec<(&str, &str)> = self
            .attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        ctx.writer.element(&self.name, &attributes);
        Ok(())
    }
}

#[derive(Debug)]
struct EndElement;

impl RenderCommand for EndElement {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        ctx.writer.end();
        Ok(())
    }
}

#[derive(Debug)]
struct Text(String);

impl RenderCommand for Text {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        ctx.writer.write(&self.0);
        Ok(())
    }
}

#[derive(Debug)]
struct Raw(String);

impl RenderCommand for Raw {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        ctx.writer.write_raw(&self.0);
        Ok(())
    }
}

#[derive(Debug)]
struct Comment(String);

impl RenderCommand for Comment {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        ctx.writer.comment(&self.0);
        Ok(())
    }
}

#[derive(Debug)]
struct Expansion {
    binding: Arc<dyn Binding>,
}

impl RenderCommand for Expansion {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        let value = self.binding.get().map_err(|source| RenderError::Command {
            command: format!("{self:?}"),
            source,
        })?;
        if !value.is_null() {
            ctx.writer.write(&value.coerce_string());
        }
        Ok(())
    }
}

#[derive(Debug)]
struct RenderBody {
    element: ElementId,
}

impl RenderCommand for RenderBody {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        ctx.page
            .element(self.element)
            .enqueue_before_render_body(ctx.queue);
        Ok(())
    }
}

struct RenderableCommand(Arc<dyn Renderable>);

impl fmt::Debug for RenderableCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Renderable[{:?}]", self.0)
    }
}

impl RenderCommand for RenderableCommand {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        self.0
            .render(&mut *ctx.writer)
            .map_err(|source| RenderError::Command {
                command: format!("{self:?}"),
                source,
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blocks
// ─────────────────────────────────────────────────────────────────────────────

/// A named (or body) fragment of template that renders its commands in order.
#[derive(Clone)]
pub struct Block {
    description: String,
    location: Location,
    commands: Vec<Arc<dyn RenderCommand>>,
}

impl Block {
    /// An empty block.
    pub fn new(description: impl Into<String>, location: Location) -> Self {
        Self {
            description: description.into(),
            location,
            commands: Vec::new(),
        }
    }

    /// Appends a command.
    pub fn add(&mut self, command: Arc<dyn RenderCommand>) {
        self.commands.push(command);
    }

    /// Appends a command, builder style.
    #[must_use]
    pub fn with(mut self, command: Arc<dyn RenderCommand>) -> Self {
        self.add(command);
        self
    }

    /// Where the block was declared.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Number of commands in the block.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the block has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block[{}, at {}]", self.description, self.location)
    }
}

impl RenderCommand for Block {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        for command in self.commands.iter().rev() {
            ctx.queue.push(Arc::clone(command));
        }
        Ok(())
    }
}

/// The body of a component that has none: renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderBlock;

impl RenderCommand for PlaceholderBlock {
    fn render(&self, _ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        Ok(())
    }
}
