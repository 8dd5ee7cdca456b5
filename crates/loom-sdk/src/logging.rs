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

//! Logger installation for applications built on the SDK.

use crate::config::LoomConfig;
use env_logger::{Builder, Env};

/// Installs `env_logger` as the global logger.
///
/// `RUST_LOG` wins when set; otherwise the configured filter applies. Fails
/// if a logger is already installed.
pub fn init(config: &LoomConfig) -> Result<(), log::SetLoggerError> {
    builder(config).try_init()
}

fn builder(config: &LoomConfig) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or(config.log_filter.as_str()));
    if config.production_mode {
        builder.filter_module("loom::render", log::LevelFilter::Info);
    }
    builder
}
