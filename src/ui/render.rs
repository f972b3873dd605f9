//! Plain-text rendering of the recipe page.

use crate::spoonacular::{Recipe, RecipeDetails};
use crate::ui::controller::{PageState, PageView};
use crate::utils::truncate_chars;
use regex::Regex;
use std::sync::LazyLock;

pub const LOADING_TEXT: &str = "Fetching delicious recipes...";
pub const EMPTY_HINT: &str = "Try searching for different ingredients or dish names.";

const SUMMARY_CHARS: usize = 140;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("HTML tag pattern is valid"));

/// One line per row of the page, top to bottom.
pub fn render(view: &PageView) -> Vec<String> {
    let query = view.query.trim();
    match &view.state {
        PageState::Idle => Vec::new(),
        PageState::Loading => vec![LOADING_TEXT.to_owned()],
        PageState::Error { message } => vec![
            format!("Oops! {message}"),
            "Type :retry to try again.".to_owned(),
        ],
        PageState::Success { results } if results.is_empty() && !query.is_empty() => vec![
            format!("No recipes found for \"{query}\""),
            String::new(),
            "No recipes found for your search.".to_owned(),
            EMPTY_HINT.to_owned(),
        ],
        PageState::Success { results } => {
            let mut lines = Vec::with_capacity(results.len() * 3 + 2);
            if !query.is_empty() {
                lines.push(format!(
                    "Found {} recipe{} for \"{}\"",
                    results.len(),
                    if results.len() == 1 { "" } else { "s" },
                    query
                ));
                lines.push(String::new());
            } else if !results.is_empty() {
                lines.push("Featured Recipes".to_owned());
                lines.push(String::new());
            }
            for recipe in results {
                lines.extend(render_card(recipe));
            }
            lines
        }
    }
}

/// A recipe card: title line, optional facts line, optional summary snippet.
pub fn render_card(recipe: &Recipe) -> Vec<String> {
    let mut lines = vec![format!("#{} {}", recipe.id, recipe.title)];

    let mut facts = Vec::new();
    if let Some(minutes) = recipe.ready_in_minutes {
        facts.push(format!("{minutes} min"));
    }
    if let Some(servings) = recipe.servings {
        facts.push(format!(
            "{servings} serving{}",
            if servings == 1 { "" } else { "s" }
        ));
    }
    if let Some(cents) = recipe.price_per_serving {
        facts.push(format!("${:.2}/serving", cents / 100.0));
    }
    if !facts.is_empty() {
        lines.push(format!("    {}", facts.join(" · ")));
    }

    if let Some(summary) = recipe.summary.as_deref() {
        let text = summary_text(summary);
        if !text.is_empty() {
            lines.push(format!("    {}", truncate_chars(&text, SUMMARY_CHARS)));
        }
    }
    lines
}

/// Full recipe page: the card, tags, ingredients, then instructions.
pub fn render_details(details: &RecipeDetails) -> Vec<String> {
    let mut lines = render_card(&details.recipe);

    let tags: Vec<&str> = details
        .cuisines
        .iter()
        .chain(&details.dish_types)
        .chain(&details.diets)
        .map(String::as_str)
        .collect();
    if !tags.is_empty() {
        lines.push(format!("    [{}]", tags.join(", ")));
    }

    if !details.extended_ingredients.is_empty() {
        lines.push(String::new());
        lines.push("Ingredients".to_owned());
        lines.extend(
            details
                .extended_ingredients
                .iter()
                .map(|ingredient| format!("  - {}", ingredient.original)),
        );
    }

    let instructions = details
        .instructions
        .as_deref()
        .map(summary_text)
        .unwrap_or_default();
    lines.push(String::new());
    lines.push("Instructions".to_owned());
    if instructions.is_empty() {
        lines.push("  No instructions provided.".to_owned());
    } else {
        lines.push(format!("  {instructions}"));
    }
    lines
}

/// Strip markup and entities from an HTML summary.
pub fn summary_text(html: &str) -> String {
    let without_tags = HTML_TAG.replace_all(html, "");
    let unescaped = htmlize::unescape(&*without_tags);
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}
