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

//! Logger installation.

use env_logger::{Builder, Env};

/// Installs `env_logger` as the `log` backend.
///
/// `RUST_LOG` takes precedence over `default_filter`. The wgpu internals are
/// capped at `warn` unless `RUST_LOG` names them. Calling this more than once
/// is harmless: only the first call installs a logger.
///
/// Returns `true` when this call installed the logger.
pub fn init_logging(default_filter: &str) -> bool {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));
    if std::env::var_os("RUST_LOG").is_none() {
        builder
            .filter_module("wgpu_hal", log::LevelFilter::Warn)
            .filter_module("wgpu_core", log::LevelFilter::Warn)
            .filter_module("naga", log::LevelFilter::Warn);
    }
    builder.try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging("debug");
        // Whatever the first call did, a second one never installs again.
        assert!(!init_logging("info"));
        log::info!("logging initialised twice without panicking");
    }
}
