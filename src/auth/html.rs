//! Extraction helpers for the login-flow HTML pages.
//!
//! Each login page carries exactly one `<form>`; two of them carry hidden
//! `code`/`state` inputs and one carries the continuation link as its
//! first anchor. The helpers return `None` when the expected element or
//! attribute is missing; callers attach the step context to the error.

use scraper::{Html, Selector};

fn selector(css: &str) -> Selector {
    // The selectors below are string literals and always parse.
    Selector::parse(css).expect("static selector")
}

/// `action` attribute of the page's form.
pub fn form_action(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&selector("form"))
        .next()?
        .value()
        .attr("action")
        .map(str::to_string)
}

/// `method` attribute of the page's form, lowercased. Defaults to `get`
/// when the attribute is missing, matching browser behavior.
pub fn form_method(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let form = document.select(&selector("form")).next()?;
    Some(
        form.value()
            .attr("method")
            .unwrap_or("get")
            .to_ascii_lowercase(),
    )
}

/// `value` attribute of the input named `name`.
pub fn input_value(html: &str, name: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&selector("input"))
        .find(|input| input.value().attr("name") == Some(name))?
        .value()
        .attr("value")
        .map(str::to_string)
}

/// `href` of the first anchor on the page.
pub fn first_anchor_href(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&selector("a"))
        .next()?
        .value()
        .attr("href")
        .map(str::to_string)
}
