#![allow(dead_code)]

use docquery::{bson::Document, document::from_json, prelude::*};
use serde_json::{Value, json};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn documents(value: Value) -> Vec<Document> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| from_json(item).unwrap())
            .collect(),
        other => panic!("fixture must be an array, got {}", other),
    }
}

/// Eight people sorted by name, each with quotes, nested users and sort probes.
pub fn database() -> Vec<Document> {
    documents(json!([
        {
            "id": 1, "name": "Alfa", "category": "c1",
            "nested": { "users": ["Ahad", "Pooya"] },
            "quote": "The best way to predict the future is to invent it.",
            "author": "Alan Kay", "text": "AAB", "numberString": "30", "_deleted": false
        },
        {
            "id": 2, "name": "Bravo", "category": "c2",
            "nested": { "users": ["Pooya", "Sebastien"] },
            "quote": "Talk is cheap. Show me the code.",
            "author": "Linus Torvalds", "text": "aAb", "numberString": "1", "_deleted": true
        },
        {
            "id": 3, "name": "Charlie", "category": "c3",
            "nested": { "users": ["Ahad"] },
            "quote": "Simplicity is prerequisite for reliability.",
            "author": "Edsger Dijkstra", "text": "Aab", "numberString": "100", "_deleted": false
        },
        {
            "id": 4, "name": "Delta", "category": "c1",
            "nested": { "users": ["Sebastien"] },
            "quote": "If you want to go fast, go alone.",
            "author": "Woodrow Wilson", "text": "aab", "numberString": "4", "_deleted": false
        },
        {
            "id": 5, "name": "Echo", "category": "c2",
            "nested": { "users": ["Ahad", "Sebastien", "Pooya"] },
            "quote": "Whatever you are, be a good one.",
            "author": "William Makepeace", "text": "AaB", "numberString": "2", "_deleted": true
        },
        {
            "id": 6, "name": "Foxtrot", "category": "c4",
            "nested": { "users": [] },
            "quote": "The way to get started is to quit talking and begin doing.",
            "author": "Walt Disney", "text": "aAB", "numberString": "20", "_deleted": false
        },
        {
            "id": 7, "name": "Golf", "category": "c3",
            "nested": { "users": ["Pooya"] },
            "quote": "Stay hungry, stay foolish.",
            "author": "Steve Jobs", "text": "aaB", "numberString": "10", "_deleted": false
        },
        {
            "id": 8, "name": "Hotel", "category": "c2",
            "nested": { "users": ["Ahad"] },
            "quote": "Life is what happens when you are busy making other plans.",
            "author": "John Lennon", "text": "AAb", "numberString": "3", "_deleted": false
        }
    ]))
}

/// The fixture in reverse, so that ordering has to come from the query.
pub fn fetcher() -> StaticFetcher {
    StaticFetcher::new(database().into_iter().rev().collect())
}

/// Three pages at `/a`, `/b` and `/c`.
pub fn letters() -> StaticFetcher {
    StaticFetcher::new(documents(json!([
        { "id": 1, "path": "/a" },
        { "id": 2, "path": "/b" },
        { "id": 3, "path": "/c" }
    ])))
}

/// A small documentation site in two locales.
pub fn site() -> Vec<Document> {
    documents(json!([
        { "id": "content:index.md", "path": "/", "file": "index.md", "locale": "en", "title": "Home" },
        { "id": "content:fr:index.md", "path": "/fr", "file": "fr/index.md", "locale": "fr", "title": "Accueil" },
        { "id": "content:1.getting-started:1.installation.md", "path": "/getting-started/installation", "file": "1.getting-started/1.installation.md", "locale": "en", "title": "Installation", "icon": "download" },
        { "id": "content:1.getting-started:2.configuration.md", "path": "/getting-started/configuration", "file": "1.getting-started/2.configuration.md", "locale": "en", "title": "Configuration" },
        { "id": "content:1.getting-started:10.deployment.md", "path": "/getting-started/deployment", "file": "1.getting-started/10.deployment.md", "locale": "en", "title": "Deployment", "draft": true },
        { "id": "content:1.getting-started:_dir.yml", "path": "/getting-started/_dir", "file": "1.getting-started/_dir.yml", "locale": "en", "title": "dir", "partial": true, "body": { "icon": "rocket" } },
        { "id": "content:2.guide:index.md", "path": "/guide", "file": "2.guide/index.md", "locale": "en", "title": "Guide", "icon": "book" },
        { "id": "content:2.guide:1.queries.md", "path": "/guide/queries", "file": "2.guide/1.queries.md", "locale": "en", "title": "Queries" },
        { "id": "content:3.internal:1.notes.md", "path": "/internal/notes", "file": "3.internal/1.notes.md", "locale": "en", "title": "Notes" },
        { "id": "content:3.internal:_dir.yml", "path": "/internal/_dir", "file": "3.internal/_dir.yml", "locale": "en", "partial": true, "navigationEnabled": false },
        { "id": "content:_snippet.md", "path": "/_snippet", "file": "_snippet.md", "locale": "en", "title": "Snippet", "partial": true }
    ]))
}

pub fn field<'a>(documents: &'a [Document], name: &str) -> Vec<&'a str> {
    documents.iter().filter_map(|document| document.get_str(name).ok()).collect()
}

pub fn paths(window: &[Option<Document>]) -> Vec<Option<&str>> {
    window
        .iter()
        .map(|slot| slot.as_ref().and_then(|document| document.get_str("path").ok()))
        .collect()
}
