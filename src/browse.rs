//! Listing stored contributions, newest first.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime};

use crate::models::{Category, Item};
use crate::store::CorpusStore;

/// All items of `category`, newest first. Items with equal timestamps keep
/// their stored order.
pub async fn list_items(store: &dyn CorpusStore, category: Category) -> Result<Vec<Item>> {
    let mut items = store.load_all(category).await?;
    sort_newest_first(&mut items);
    Ok(items)
}

pub fn sort_newest_first(items: &mut [Item]) {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Suffix for the "Contributed By" line.
///
/// ISO 8601 timestamps render as ` on YYYY-MM-DD HH:MM`; anything else is
/// shown verbatim in parentheses. A missing timestamp renders as nothing.
pub fn format_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if raw.len() >= 19 {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return format!(" on {}", dt.format("%Y-%m-%d %H:%M"));
        }
        for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
                return format!(" on {}", dt.format("%Y-%m-%d %H:%M"));
            }
        }
    }
    format!(" (Timestamp: {})", raw)
}

pub fn render_item(item: &Item) -> String {
    let mut out = format!("{}: {}\n", item.category.label(), item.text);
    out.push_str(&format!("Language: {}\n", item.language));
    if !item.region_hint.trim().is_empty() {
        out.push_str(&format!("Region: {}\n", item.region_hint));
    }
    out.push_str(&format!(
        "Contributed By: {}{}\n",
        item.contributor,
        format_timestamp(&item.timestamp)
    ));
    out
}

pub fn empty_message(category: Category) -> String {
    format!("No {} submitted yet.", category.plural())
}

/// Print one category (or both) to stdout, as text or JSON.
///
/// A category that cannot be loaded is reported on stderr and shown as empty.
pub async fn run_browse(
    store: &dyn CorpusStore,
    category: Option<Category>,
    json: bool,
) -> Result<()> {
    let categories: Vec<Category> = match category {
        Some(c) => vec![c],
        None => Category::ALL.to_vec(),
    };

    let mut all = Vec::new();
    for category in categories {
        let items = match list_items(store, category).await {
            Ok(items) => items,
            Err(e) => {
                eprintln!("Warning: could not load {}: {:#}", category.plural(), e);
                Vec::new()
            }
        };
        all.push((category, items));
    }

    if json {
        let items: Vec<&Item> = all.iter().flat_map(|(_, items)| items.iter()).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for (i, (category, items)) in all.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("== {} ==", title_case(category.plural()));
        if items.is_empty() {
            println!("{}", empty_message(*category));
            continue;
        }
        for item in items {
            println!();
            print!("{}", render_item(item));
        }
    }
    Ok(())
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn stamped(text: &str, ts: &str) -> Item {
        let mut item = Item::new(Category::Proverb, text, "Hindi".into(), None, None);
        item.timestamp = ts.to_string();
        item
    }

    #[test]
    fn iso_timestamps_are_shortened() {
        assert_eq!(
            format_timestamp("2024-03-01T14:05:09.123456Z"),
            " on 2024-03-01 14:05"
        );
        assert_eq!(
            format_timestamp("2024-03-01T14:05:09.123456"),
            " on 2024-03-01 14:05"
        );
        assert_eq!(
            format_timestamp("2024-03-01T14:05:09+05:30"),
            " on 2024-03-01 14:05"
        );
        assert_eq!(format_timestamp("2024-03-01 14:05:09"), " on 2024-03-01 14:05");
        assert_eq!(
            format_timestamp("2024-03-01 14:05:09.5"),
            " on 2024-03-01 14:05"
        );
    }

    #[test]
    fn odd_timestamps_are_shown_raw() {
        assert_eq!(format_timestamp("yesterday"), " (Timestamp: yesterday)");
        assert_eq!(
            format_timestamp("2024-03-01 around noon"),
            " (Timestamp: 2024-03-01 around noon)"
        );
        assert_eq!(format_timestamp(""), "");
    }

    #[test]
    fn render_skips_blank_region() {
        let mut item = stamped("Slow and steady wins the race.", "2024-01-02T03:04:05Z");
        item.contributor = "Asha".into();
        let text = render_item(&item);
        assert_eq!(
            text,
            "Proverb: Slow and steady wins the race.\nLanguage: Hindi\n\
             Contributed By: Asha on 2024-01-02 03:04\n"
        );

        item.region_hint = "Punjab".into();
        assert!(render_item(&item).contains("Region: Punjab\n"));
    }

    #[test]
    fn empty_messages_name_the_category() {
        assert_eq!(empty_message(Category::Proverb), "No proverbs submitted yet.");
        assert_eq!(
            empty_message(Category::LifeLesson),
            "No life lessons submitted yet."
        );
        assert_eq!(title_case("life lessons"), "Life Lessons");
    }

    #[tokio::test]
    async fn newest_first_with_stable_ties() {
        let store = InMemoryStore::with_items([
            stamped("old", "2023-01-01T00:00:00Z"),
            stamped("tie-a", "2024-01-01T00:00:00Z"),
            stamped("tie-b", "2024-01-01T00:00:00Z"),
            stamped("new", "2025-01-01T00:00:00Z"),
        ]);
        let texts: Vec<String> = list_items(&store, Category::Proverb)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.text)
            .collect();
        assert_eq!(texts, vec!["new", "tie-a", "tie-b", "old"]);
    }
}
