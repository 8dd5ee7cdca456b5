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

//! Static component metadata: render phases and the component model.

use loom_core::Location;
use std::fmt;

/// The eight render phases a component may handle, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPhase {
    /// Decide whether the component renders at all.
    SetupRender,
    /// Usually opens the component's outer element.
    BeginRender,
    /// Runs before the template is rendered; `false` skips the template.
    BeforeRenderTemplate,
    /// Runs before the body is rendered; `false` skips the body.
    BeforeRenderBody,
    /// Runs after the body; `false` renders the body again.
    AfterRenderBody,
    /// Runs after the template; `false` renders the template again.
    AfterRenderTemplate,
    /// Usually closes the outer element; `false` restarts at `BeginRender`.
    AfterRender,
    /// Last chance to clean up; `false` restarts at `SetupRender`.
    CleanupRender,
}

impl RenderPhase {
    /// Every phase in forward order.
    pub const ALL: [RenderPhase; 8] = [
        RenderPhase::SetupRender,
        RenderPhase::BeginRender,
        RenderPhase::BeforeRenderTemplate,
        RenderPhase::BeforeRenderBody,
        RenderPhase::AfterRenderBody,
        RenderPhase::AfterRenderTemplate,
        RenderPhase::AfterRender,
        RenderPhase::CleanupRender,
    ];

    /// Whether components are invoked in reverse order for this phase.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            RenderPhase::AfterRenderBody
                | RenderPhase::AfterRenderTemplate
                | RenderPhase::AfterRender
                | RenderPhase::CleanupRender
        )
    }

    /// The phase name, as used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            RenderPhase::SetupRender => "SetupRender",
            RenderPhase::BeginRender => "BeginRender",
            RenderPhase::BeforeRenderTemplate => "BeforeRenderTemplate",
            RenderPhase::BeforeRenderBody => "BeforeRenderBody",
            RenderPhase::AfterRenderBody => "AfterRenderBody",
            RenderPhase::AfterRenderTemplate => "AfterRenderTemplate",
            RenderPhase::AfterRender => "AfterRender",
            RenderPhase::CleanupRender => "CleanupRender",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of render phases, stored as a bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PhaseSet(u8);

impl PhaseSet {
    /// The empty set.
    pub const EMPTY: PhaseSet = PhaseSet(0);

    /// A set holding the given phases.
    pub fn of(phases: &[RenderPhase]) -> Self {
        phases.iter().fold(Self::EMPTY, |set, phase| set.with(*phase))
    }

    /// This set plus one phase.
    #[must_use]
    pub fn with(self, phase: RenderPhase) -> Self {
        PhaseSet(self.0 | phase.bit())
    }

    /// The union of both sets.
    #[must_use]
    pub fn union(self, other: PhaseSet) -> Self {
        PhaseSet(self.0 | other.0)
    }

    /// Whether the phase is in the set.
    pub fn contains(self, phase: RenderPhase) -> bool {
        self.0 & phase.bit() != 0
    }

    /// Whether no phase is in the set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The phases in the set, in forward order.
    pub fn iter(self) -> impl Iterator<Item = RenderPhase> {
        RenderPhase::ALL
            .into_iter()
            .filter(move |phase| self.contains(*phase))
    }
}

/// Page lifecycle notifications a component can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageLifecycle {
    /// The page finished loading.
    Loaded,
    /// The page was attached to a request.
    Attached,
    /// The page was detached from a request.
    Detached,
    /// The page was reset (returned to without an event or render).
    Reset,
}

/// A formal parameter of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterModel {
    name: String,
    required: bool,
}

impl ParameterModel {
    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the parameter must be bound.
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Static metadata for a component or mixin type, shared by every instance.
#[derive(Debug, Clone)]
pub struct ComponentModel {
    name: String,
    handled_phases: PhaseSet,
    parameters: Vec<ParameterModel>,
    mixin_after: bool,
    supports_informal: bool,
    lifecycle: Vec<PageLifecycle>,
    location: Location,
}

impl ComponentModel {
    /// A model for the named component type, handling no phases.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            location: Location::new(name.clone(), 0),
            name,
            handled_phases: PhaseSet::EMPTY,
            parameters: Vec::new(),
            mixin_after: false,
            supports_informal: false,
            lifecycle: Vec::new(),
        }
    }

    /// Declares a handled render phase.
    #[must_use]
    pub fn handles(mut self, phase: RenderPhase) -> Self {
        self.handled_phases = self.handled_phases.with(phase);
        self
    }

    /// Declares a formal parameter.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, required: bool) -> Self {
        self.parameters.push(ParameterModel {
            name: name.into(),
            required,
        });
        self
    }

    /// Marks a mixin as running after the core component.
    #[must_use]
    pub fn mixin_after(mut self, after: bool) -> Self {
        self.mixin_after = after;
        self
    }

    /// Allows bindings for undeclared parameters.
    #[must_use]
    pub fn informal_parameters(mut self, supported: bool) -> Self {
        self.supports_informal = supported;
        self
    }

    /// Declares a page lifecycle notification the component wants.
    #[must_use]
    pub fn listens(mut self, event: PageLifecycle) -> Self {
        if !self.lifecycle.contains(&event) {
            self.lifecycle.push(event);
        }
        self
    }

    /// Sets the base resource location.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// The component type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The render phases this component handles.
    pub fn handled_phases(&self) -> PhaseSet {
        self.handled_phases
    }

    /// The formal parameters, in declaration order.
    pub fn parameters(&self) -> &[ParameterModel] {
        &self.parameters
    }

    /// The formal parameter with the name (case-insensitive), if declared.
    pub fn parameter_model(&self, name: &str) -> Option<&ParameterModel> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name.eq_ignore_ascii_case(name))
    }

    /// Whether this (mixin) model runs after the core component.
    pub fn is_mixin_after(&self) -> bool {
        self.mixin_after
    }

    /// Whether bindings for undeclared parameters are accepted.
    pub fn supports_informal_parameters(&self) -> bool {
        self.supports_informal
    }

    /// The page lifecycle notifications the component wants.
    pub fn lifecycle(&self) -> &[PageLifecycle] {
        &self.lifecycle
    }

    /// The base resource location.
    pub fn location(&self) -> &Location {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_phases() {
        let reverse: Vec<_> = RenderPhase::ALL
            .into_iter()
            .filter(|phase| phase.is_reverse())
            .collect();
        assert_eq!(
            reverse,
            vec![
                RenderPhase::AfterRenderBody,
                RenderPhase::AfterRenderTemplate,
                RenderPhase::AfterRender,
                RenderPhase::CleanupRender
            ]
        );
    }

    #[test]
    fn test_phase_set_operations() {
        let set = PhaseSet::of(&[RenderPhase::AfterRender, RenderPhase::SetupRender]);
        assert!(set.contains(RenderPhase::SetupRender));
        assert!(!set.contains(RenderPhase::BeginRender));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![RenderPhase::SetupRender, RenderPhase::AfterRender]
        );
        assert!(PhaseSet::EMPTY.is_empty());
        assert_eq!(
            PhaseSet::EMPTY.union(set),
            set.with(RenderPhase::AfterRender)
        );
    }

    #[test]
    fn test_parameter_lookup_ignores_case() {
        let model = ComponentModel::new("TextField")
            .parameter("value", true)
            .parameter("disabled", false);
        assert!(model.parameter_model("VALUE").unwrap().is_required());
        assert!(!model.parameter_model("disabled").unwrap().is_required());
        assert!(model.parameter_model("size").is_none());
    }
}
