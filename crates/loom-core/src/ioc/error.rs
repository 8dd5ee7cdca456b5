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

use crate::HandlerError;

/// Errors raised while declaring, resolving or constructing services.
#[derive(Debug, thiserror::Error)]
pub enum IocError {
    /// No service is registered under the requested id.
    #[error("Service id '{id}' is not defined by any module. Defined service ids: {}", .available.join(", "))]
    ServiceNotFound {
        /// The requested id.
        id: String,
        /// Every defined id, sorted.
        available: Vec<String>,
    },

    /// No service is registered for the requested type.
    #[error("No service implements type {type_name}")]
    NoServiceForType {
        /// The requested type.
        type_name: &'static str,
    },

    /// More than one service is registered for the requested type.
    #[error("Type {type_name} is matched by {} services: {}. Automatic dependency resolution requires exactly one match", .ids.len(), .ids.join(", "))]
    AmbiguousService {
        /// The requested type.
        type_name: &'static str,
        /// Ids of the matching services.
        ids: Vec<String>,
    },

    /// A service exists under the id, but with a different type.
    #[error("Service '{id}' is of type {actual}, not the requested type {expected}")]
    ServiceTypeMismatch {
        /// The service id.
        id: String,
        /// The requested type.
        expected: &'static str,
        /// The registered type.
        actual: &'static str,
    },

    /// A type-erased value could not be recovered as the expected type.
    #[error("Value for {context} is not of type {expected}")]
    WrongType {
        /// Where the value came from.
        context: String,
        /// The expected type.
        expected: &'static str,
    },

    /// Two services were declared with the same id.
    #[error("Service id '{0}' has already been defined")]
    DuplicateServiceId(String),

    /// Realizing a service required realizing the same service again.
    #[error("Construction of service '{id}' has failed due to recursion: the service depends on itself in some way ({})", .chain.join(" -> "))]
    Recursion {
        /// The service being realized twice.
        id: String,
        /// The realization chain leading back to it.
        chain: Vec<String>,
    },

    /// An autobuild was requested for a type without a registered recipe.
    #[error("Type {type_name} can not be autobuilt: no construction recipe has been registered for it")]
    NotAutobuildable {
        /// The requested type.
        type_name: &'static str,
    },

    /// A construction recipe did not declare a constructor.
    #[error("No constructor was declared for {0}")]
    NoConstructor(String),

    /// A construction recipe declared more than one constructor.
    #[error("Multiple constructors were declared for {0}; exactly one is required")]
    AmbiguousConstructor(String),

    /// Resolving one constructor parameter, field or method parameter failed.
    #[error("Error obtaining injected value for {point}: {source}")]
    Injection {
        /// Describes the parameter or field being injected.
        point: String,
        /// The underlying failure.
        #[source]
        source: Box<IocError>,
    },

    /// User code (a constructor, factory or post-injection method) failed.
    #[error("Error invoking {operation}: {source}")]
    Invocation {
        /// Describes what was being invoked.
        operation: String,
        /// The error returned by the user code.
        #[source]
        source: HandlerError,
    },
}

impl IocError {
    /// The innermost error message, skipping injection wrappers.
    pub fn root_message(&self) -> String {
        match self {
            IocError::Injection { source, .. } => source.root_message(),
            IocError::Invocation { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}
