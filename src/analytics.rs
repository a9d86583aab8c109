use chrono::Local;

use crate::identity::created_at;
use crate::models::Client;

/// Label used for clients without a location
pub const NO_LOCATION: &str = "No location";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub with_email: usize,
    pub with_phone: usize,
    pub with_company: usize,
    pub with_notes: usize,
    /// Clients per tag, in first-seen order
    pub by_tag: Vec<(String, usize)>,
    /// Clients per location, in first-seen order
    pub by_location: Vec<(String, usize)>,
    /// Clients per creation month (`YYYY-MM`, local time), oldest first.
    /// Ids that carry no creation time are not counted.
    pub by_month: Vec<(String, usize)>,
}

impl Summary {
    /// Share of clients with an email, rounded to a whole percent
    pub fn email_percent(&self) -> u32 {
        percent(self.with_email, self.total)
    }

    pub fn phone_percent(&self) -> u32 {
        percent(self.with_phone, self.total)
    }
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

fn bump(counts: &mut Vec<(String, usize)>, key: &str) {
    match counts.iter_mut().find(|(k, _)| k == key) {
        Some((_, n)) => *n += 1,
        None => counts.push((key.to_string(), 1)),
    }
}

pub fn summarize(clients: &[Client]) -> Summary {
    let mut summary = Summary {
        total: clients.len(),
        ..Summary::default()
    };

    for client in clients {
        summary.with_email += usize::from(!client.email.is_empty());
        summary.with_phone += usize::from(!client.phone.is_empty());
        summary.with_company += usize::from(!client.company.is_empty());
        summary.with_notes += usize::from(!client.notes.is_empty());

        for tag in &client.tags {
            bump(&mut summary.by_tag, tag);
        }

        let location = client.location.trim();
        bump(
            &mut summary.by_location,
            if location.is_empty() { NO_LOCATION } else { location },
        );

        if let Some(created) = created_at(client.id) {
            let month = created.with_timezone(&Local).format("%Y-%m").to_string();
            bump(&mut summary.by_month, &month);
        }
    }

    summary.by_month.sort();
    summary
}
