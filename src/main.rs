// Copyright 2026 BadCompany
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

// Main entry point for the Warden security gateway.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use warden::config::Config;

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Security gateway for MCP tool traffic")]
struct Cli {
    /// Run as a stdio proxy wrapping the upstream command instead of the
    /// HTTP listener
    #[arg(long)]
    proxy: bool,

    /// HTTP listen address override (listener mode)
    #[arg(long)]
    listen: Option<String>,

    /// Upstream command and arguments (proxy mode), e.g.
    /// `warden --proxy -- npx -y @modelcontextprotocol/server-filesystem /tmp`
    #[arg(last = true)]
    upstream: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config from env, using defaults: {}", e);
        Config::default()
    });
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    init_tracing(&config);

    let config = Arc::new(config);
    if cli.proxy {
        info!("starting warden in stdio proxy mode");
        warden::mcp::proxy::run(config, cli.upstream).await
    } else {
        info!("starting warden in HTTP listener mode");
        warden::server::serve(config).await
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warden=debug,info"));

    // Stdout is the protocol channel in proxy mode; diagnostics always go
    // to stderr.
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
