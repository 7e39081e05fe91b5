//! Filmstrip ordering.
//!
//! Sorting is a pure re-ordering of the item list: it never schedules a
//! decode and never touches the cache. The sort is stable, so items with
//! equal keys keep their scan order.
//!
//! Items whose metadata hasn't arrived yet sort as if they had the minimum
//! timestamp and a size of zero.

use crate::scan::BrowsableItem;
use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Date,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

fn created(item: &BrowsableItem) -> NaiveDateTime {
    item.metadata
        .as_ref()
        .map(|m| m.created)
        .unwrap_or(NaiveDateTime::MIN)
}

fn file_size(item: &BrowsableItem) -> u64 {
    item.metadata.as_ref().map(|m| m.file_size).unwrap_or(0)
}

fn compare(a: &BrowsableItem, b: &BrowsableItem, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.display_name.cmp(&b.display_name),
        SortKey::Date => created(a).cmp(&created(b)),
        SortKey::Size => file_size(a).cmp(&file_size(b)),
    }
}

/// Re-order `items` in place.
pub fn sort_items(items: &mut [BrowsableItem], key: SortKey, direction: SortDirection) {
    match direction {
        SortDirection::Ascending => items.sort_by(|a, b| compare(a, b, key)),
        SortDirection::Descending => items.sort_by(|a, b| compare(b, a, key)),
    }
}
