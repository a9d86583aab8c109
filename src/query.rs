use crate::catalog::SUGGESTED_TAGS;
use crate::models::Client;

/// Clients matching both the search term and the tag selection, in their original order.
///
/// The term matches case-insensitively against first name, last name,
/// email and company. An empty tag selection matches every client;
/// otherwise a client needs at least one of the selected tags.
pub fn filter_clients<'a>(
    clients: &'a [Client],
    search_term: &str,
    selected_tags: &[String],
) -> Vec<&'a Client> {
    let term = search_term.to_lowercase();
    clients
        .iter()
        .filter(|c| matches_term(c, &term) && matches_tags(c, selected_tags))
        .collect()
}

fn matches_term(client: &Client, term: &str) -> bool {
    [
        &client.first_name,
        &client.last_name,
        &client.email,
        &client.company,
    ]
    .iter()
    .any(|value| value.to_lowercase().contains(term))
}

fn matches_tags(client: &Client, selected: &[String]) -> bool {
    selected.is_empty() || client.tags.iter().any(|tag| selected.contains(tag))
}

/// Suggested tags first, then every other tag in first-seen order.
pub fn available_tags(clients: &[Client]) -> Vec<String> {
    let mut tags: Vec<String> = SUGGESTED_TAGS.iter().map(|t| t.to_string()).collect();
    for tag in clients.iter().flat_map(|c| &c.tags) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

/// Adds `tag` to the selection, or removes it if already selected.
pub fn toggle_selected(selected: &mut Vec<String>, tag: &str) {
    match selected.iter().position(|t| t == tag) {
        Some(index) => {
            selected.remove(index);
        }
        None => selected.push(tag.to_string()),
    }
}
