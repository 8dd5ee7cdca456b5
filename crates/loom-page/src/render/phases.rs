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

//! The render-phase state machine of one element.
//!
//! Each element owns a [`PhaseChain`]: one command per phase its components
//! handle, wired so that unhandled phases cost nothing at render time. A
//! phase that no component handles is replaced by its successor when the
//! chain is built:
//!
//! ```text
//! Setup -> Begin -> BeforeTemplate -> [template] -> AfterTemplate -> After -> Cleanup
//!                                         |
//!                  BeforeBody -> [body] -> AfterBody     (via <t:body/>)
//! ```
//!
//! Two synthetic steps fill the gaps left by collapsing: `OptimizedBegin`
//! stands in for an unhandled `BeginRender` whose `AfterRender` still has to
//! be scheduled, and `RenderTemplate` stands in for an unhandled
//! `BeforeRenderTemplate`.

use super::{RenderCommand, RenderContext};
use crate::error::RenderError;
use crate::model::{PhaseSet, RenderPhase};
use crate::page::ElementId;
use loom_core::ElementHandle;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    OptimizedBegin,
    RenderTemplate,
    Phase(RenderPhase),
}

impl Step {
    fn name(self) -> &'static str {
        match self {
            Step::OptimizedBegin => "OptimizedBegin",
            Step::RenderTemplate => "RenderTemplate",
            Step::Phase(phase) => phase.name(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PhaseChain
// ─────────────────────────────────────────────────────────────────────────────

/// The collapsed phase commands of one element.
pub(crate) struct PhaseChain {
    setup: Arc<dyn RenderCommand>,
    begin: Arc<dyn RenderCommand>,
    before_template: Arc<dyn RenderCommand>,
    after_template: Option<Arc<dyn RenderCommand>>,
    before_body: Arc<dyn RenderCommand>,
    after_body: Option<Arc<dyn RenderCommand>>,
    after: Option<Arc<dyn RenderCommand>>,
    cleanup: Option<Arc<dyn RenderCommand>>,
}

impl PhaseChain {
    pub(crate) fn new(element: ElementId, complete_id: &str, handled: PhaseSet) -> Self {
        let complete_id: Arc<str> = Arc::from(complete_id);
        let step = |step: Step| -> Arc<dyn RenderCommand> {
            Arc::new(PhaseCommand {
                element,
                step,
                complete_id: Arc::clone(&complete_id),
            })
        };
        let phase = |phase: RenderPhase| {
            handled
                .contains(phase)
                .then(|| step(Step::Phase(phase)))
        };

        let cleanup = phase(RenderPhase::CleanupRender);
        let after = phase(RenderPhase::AfterRender).or_else(|| cleanup.clone());
        let after_template = phase(RenderPhase::AfterRenderTemplate);
        let after_body = phase(RenderPhase::AfterRenderBody);
        let before_template = phase(RenderPhase::BeforeRenderTemplate)
            .unwrap_or_else(|| step(Step::RenderTemplate));
        let begin = phase(RenderPhase::BeginRender).unwrap_or_else(|| {
            if after.is_some() {
                step(Step::OptimizedBegin)
            } else {
                Arc::clone(&before_template)
            }
        });
        let setup = phase(RenderPhase::SetupRender).unwrap_or_else(|| Arc::clone(&begin));
        // The body phase always exists: a template may render the body even
        // when no component cares about it.
        let before_body = step(Step::Phase(RenderPhase::BeforeRenderBody));

        Self {
            setup,
            begin,
            before_template,
            after_template,
            before_body,
            after_body,
            after,
            cleanup,
        }
    }

    /// The first command of a render.
    pub(crate) fn start(&self) -> &Arc<dyn RenderCommand> {
        &self.setup
    }

    /// The command that renders the element's body.
    pub(crate) fn before_body(&self) -> &Arc<dyn RenderCommand> {
        &self.before_body
    }
}

impl fmt::Debug for PhaseChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseChain")
            .field("setup", &self.setup)
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PhaseCommand
// ─────────────────────────────────────────────────────────────────────────────

struct PhaseCommand {
    element: ElementId,
    step: Step,
    complete_id: Arc<str>,
}

impl fmt::Debug for PhaseCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.step.name(), self.complete_id)
    }
}

impl RenderCommand for PhaseCommand {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        let element = ctx.page.element(self.element);
        let chain = element.phase_chain();

        let outcome = match self.step {
            Step::Phase(phase) => element.invoke_phase(ctx.page, phase, &mut *ctx.writer)?,
            Step::OptimizedBegin | Step::RenderTemplate => Default::default(),
        };
        let result = outcome.result;
        let queue = &mut *ctx.queue;

        match self.step {
            Step::Phase(RenderPhase::SetupRender) => {
                if result {
                    queue.push(Arc::clone(&chain.begin));
                } else {
                    queue.push_opt(chain.cleanup.as_ref());
                }
            }
            Step::Phase(RenderPhase::BeginRender) => {
                queue.push_opt(chain.after.as_ref());
                if result {
                    queue.push(Arc::clone(&chain.before_template));
                }
            }
            Step::OptimizedBegin => {
                queue.push_opt(chain.after.as_ref());
                queue.push(Arc::clone(&chain.before_template));
            }
            Step::Phase(RenderPhase::BeforeRenderTemplate) => {
                queue.push_opt(chain.after_template.as_ref());
                if result {
                    element.push_template(queue);
                }
            }
            Step::RenderTemplate => {
                queue.push_opt(chain.after_template.as_ref());
                element.push_template(queue);
            }
            Step::Phase(RenderPhase::BeforeRenderBody) => {
                queue.push_opt(chain.after_body.as_ref());
                if result {
                    element.push_body(queue);
                }
            }
            Step::Phase(RenderPhase::AfterRenderBody) => {
                if !result {
                    queue.push(Arc::clone(&chain.before_body));
                }
            }
            Step::Phase(RenderPhase::AfterRenderTemplate) => {
                if !result {
                    queue.push(Arc::clone(&chain.before_template));
                }
            }
            Step::Phase(RenderPhase::AfterRender) => {
                if result {
                    queue.push_opt(chain.cleanup.as_ref());
                } else {
                    queue.push(Arc::clone(&chain.begin));
                }
            }
            Step::Phase(RenderPhase::CleanupRender) => {
                if !result {
                    queue.push(Arc::clone(&chain.setup));
                }
            }
        }

        // Commands produced by handlers run before anything scheduled above,
        // in the order they were produced.
        for command in outcome.saved.into_iter().rev() {
            queue.push(command);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Element entry and exit
// ─────────────────────────────────────────────────────────────────────────────

/// Renders one element: the command a template embeds for a component.
pub(crate) struct ElementCommand {
    element: ElementId,
    complete_id: Arc<str>,
}

impl ElementCommand {
    pub(crate) fn new(element: ElementId, complete_id: &str) -> Self {
        Self {
            element,
            complete_id: Arc::from(complete_id),
        }
    }
}

impl fmt::Debug for ElementCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element[{}]", self.complete_id)
    }
}

impl RenderCommand for ElementCommand {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        let element = ctx.page.element(self.element);
        if element.is_rendering() {
            return Err(RenderError::RecursiveRender {
                component: element.complete_id().to_string(),
                location: element.location().clone(),
            });
        }
        element.set_rendering(true);
        ctx.queue.start_component(element.complete_id());
        ctx.queue.push(Arc::new(PostRenderCleanup {
            element: self.element,
            expected: ctx.writer.current_element(),
            complete_id: Arc::clone(&self.complete_id),
        }));
        ctx.queue.push(Arc::clone(element.phase_chain().start()));
        Ok(())
    }
}

/// Ends the render of one element. Carries the element that was open when
/// the render started, which must be open again now.
struct PostRenderCleanup {
    element: ElementId,
    expected: Option<ElementHandle>,
    complete_id: Arc<str>,
}

impl fmt::Debug for PostRenderCleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostRenderCleanup[{}]", self.complete_id)
    }
}

impl RenderCommand for PostRenderCleanup {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        let element = ctx.page.element(self.element);
        element.set_rendering(false);
        if ctx.writer.current_element() != self.expected {
            return Err(RenderError::UnbalancedElements {
                component: element.complete_id().to_string(),
                location: element.location().clone(),
            });
        }
        element.post_render_cleanup(ctx.page);
        ctx.queue.end_component();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(handled: &[RenderPhase]) -> PhaseChain {
        PhaseChain::new(ElementId(0), "Index:a", PhaseSet::of(handled))
    }

    fn name(command: &Arc<dyn RenderCommand>) -> String {
        format!("{command:?}")
    }

    #[test]
    fn test_nothing_handled_collapses_to_template() {
        let chain = chain(&[]);
        assert_eq!(name(chain.start()), "RenderTemplate[Index:a]");
        assert!(chain.after.is_none());
        assert!(chain.cleanup.is_none());
        assert!(chain.after_template.is_none());
    }

    #[test]
    fn test_after_render_only_uses_optimized_begin() {
        let chain = chain(&[RenderPhase::AfterRender]);
        assert_eq!(name(chain.start()), "OptimizedBegin[Index:a]");
        assert_eq!(name(&chain.before_template), "RenderTemplate[Index:a]");
        assert_eq!(name(chain.after.as_ref().unwrap()), "AfterRender[Index:a]");
    }

    #[test]
    fn test_cleanup_stands_in_for_after() {
        let chain = chain(&[RenderPhase::SetupRender, RenderPhase::CleanupRender]);
        assert_eq!(name(chain.start()), "SetupRender[Index:a]");
        assert_eq!(name(&chain.begin), "OptimizedBegin[Index:a]");
        assert_eq!(name(chain.after.as_ref().unwrap()), "CleanupRender[Index:a]");
    }

    #[test]
    fn test_before_body_always_present() {
        let chain = chain(&[]);
        assert_eq!(name(chain.before_body()), "BeforeRenderBody[Index:a]");
        assert!(chain.after_body.is_none());
    }
}
