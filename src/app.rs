use crate::cli::Command;
use crate::config::Config;
use crate::fetch::{BoundedCache, FetchClient, FetchContext, ReqwestTransport};
use crate::spoonacular::{Endpoints, FetchError};
use crate::ui::render::{render, render_card, render_details};
use crate::ui::{PageController, PageState, PageView};
use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use yansi::Paint;

/// Main application struct: the shared fetch client behind every command.
pub struct App {
    client: FetchClient,
}

impl App {
    /// Build the HTTP transport, cache and client from configuration.
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let transport = ReqwestTransport::new(config.request_timeout)
            .context("Failed to create HTTP transport")?;
        let endpoints = Endpoints::new(
            &config.spoonacular_base_url,
            config.spoonacular_api_key.clone(),
        )
        .context("Invalid SPOONACULAR_BASE_URL")?;
        let cache = BoundedCache::new(config.cache_ttl, config.cache_max_entries);

        let client = FetchClient::new(
            Arc::new(transport),
            endpoints,
            FetchContext::new(cache),
            config.fetch_options(),
        );

        info!(
            base_url = %config.spoonacular_base_url,
            cache_ttl = crate::utils::fmt_duration(config.cache_ttl),
            cache_max_entries = config.cache_max_entries,
            request_timeout = crate::utils::fmt_duration(config.request_timeout),
            max_retries = config.max_retries,
            rate_limited = client.is_rate_limited(),
            "fetch client configured"
        );
        Ok(Self { client })
    }

    /// Run one command; no command means the interactive page.
    pub async fn run(self, command: Option<Command>) -> ExitCode {
        let result = match command.unwrap_or(Command::Browse) {
            Command::Search {
                query,
                number,
                offset,
            } => self.search(&query, number, offset).await,
            Command::Random { number } => self.random(number).await,
            Command::Details { id } => self.details(id).await,
            Command::Browse => self.browse().await,
        };

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "command failed");
                eprintln!("{}", e.red());
                ExitCode::FAILURE
            }
        }
    }

    async fn search(&self, query: &str, number: u32, offset: u32) -> anyhow::Result<()> {
        let response = self
            .client
            .search_recipes(query, number, offset)
            .await
            .map_err(user_facing)?;

        println!(
            "{}",
            format!(
                "Showing {} of {} recipes for \"{}\"",
                response.results.len(),
                response.total_results,
                query.trim()
            )
            .bold()
        );
        for recipe in &response.results {
            print_lines(&render_card(recipe));
        }
        Ok(())
    }

    async fn random(&self, number: u32) -> anyhow::Result<()> {
        let response = self
            .client
            .random_recipes(number)
            .await
            .map_err(user_facing)?;

        println!("{}", "Featured Recipes".bold());
        for recipe in &response.recipes {
            print_lines(&render_card(recipe));
        }
        Ok(())
    }

    async fn details(&self, id: u64) -> anyhow::Result<()> {
        let details = self
            .client
            .recipe_details(id)
            .await
            .map_err(user_facing)?;
        print_lines(&render_details(&details));
        Ok(())
    }

    /// Line-oriented rendition of the recipe page.
    ///
    /// The page loads featured recipes on start. Each input line is a query
    /// (blank for featured again); `:retry` re-runs a failed load and `:quit`
    /// leaves. Every state change is re-rendered.
    async fn browse(&self) -> anyhow::Result<()> {
        let controller = PageController::mount(self.client.clone());
        let mut updates = controller.subscribe();
        print_view(&updates.borrow_and_update().clone());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view = updates.borrow_and_update().clone();
                    print_view(&view);
                }
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read stdin")? else {
                        break;
                    };
                    match line.trim() {
                        ":quit" | ":q" => return Ok(()),
                        ":retry" => {
                            if !controller.retry() {
                                println!("{}", "Nothing to retry.".dim());
                            }
                        }
                        query => controller.submit(query),
                    }
                }
            }
        }

        // Input closed: show how the last load ended.
        let view = controller.settled().await;
        if updates.has_changed().unwrap_or(false) {
            print_view(&view);
        }
        Ok(())
    }
}

/// Keep the technical error in the chain, show the friendly message on top.
fn user_facing(e: FetchError) -> anyhow::Error {
    let message = e.user_message();
    anyhow::Error::new(e).context(message)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        if line.starts_with('#') {
            println!("{}", line.bold());
        } else {
            println!("{line}");
        }
    }
}

fn print_view(view: &PageView) {
    let lines = render(view);
    match &view.state {
        PageState::Idle => {}
        PageState::Loading => {
            for line in &lines {
                println!("{}", line.dim());
            }
        }
        PageState::Error { .. } => {
            for line in &lines {
                println!("{}", line.red());
            }
        }
        PageState::Success { .. } => {
            if let Some((heading, rest)) = lines.split_first() {
                println!("{}", heading.green().bold());
                print_lines(rest);
            }
        }
    }
}
