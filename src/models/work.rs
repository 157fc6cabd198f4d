use std::borrow::Cow;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One unit of input an account acts upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    /// A tweet link or a username.
    Target { value: String },
    /// Free text: tweet content or a new profile value.
    Text { value: String },
    /// A link plus free text: comment content or a poll answer.
    Reply { link: String, text: String },
    /// A link plus the texts to choose from. Each account picks its own text
    /// when it reaches the link.
    Pool { link: String, texts: Vec<String> },
}

impl WorkItem {
    pub fn target(value: impl Into<String>) -> Self {
        WorkItem::Target {
            value: value.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        WorkItem::Text {
            value: value.into(),
        }
    }

    pub fn reply(link: impl Into<String>, text: impl Into<String>) -> Self {
        WorkItem::Reply {
            link: link.into(),
            text: text.into(),
        }
    }

    pub fn pool<I, S>(link: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WorkItem::Pool {
            link: link.into(),
            texts: texts.into_iter().map(Into::into).collect(),
        }
    }

    /// Link or username this item points at, if any.
    pub fn link(&self) -> Option<&str> {
        match self {
            WorkItem::Target { value } => Some(value),
            WorkItem::Reply { link, .. } | WorkItem::Pool { link, .. } => Some(link),
            WorkItem::Text { .. } => None,
        }
    }

    /// Free-text part of this item, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            WorkItem::Text { value } => Some(value),
            WorkItem::Reply { text, .. } => Some(text),
            WorkItem::Target { .. } | WorkItem::Pool { .. } => None,
        }
    }

    pub fn shape(&self) -> ItemShape {
        match self {
            WorkItem::Target { .. } => ItemShape::Target,
            WorkItem::Text { .. } => ItemShape::Text,
            WorkItem::Reply { .. } => ItemShape::Reply,
            WorkItem::Pool { .. } => ItemShape::Pool,
        }
    }

    /// The item an account sends on `iteration`.
    ///
    /// A `Pool` becomes a `Reply` with one of its texts, picked at random or
    /// round-robin by `iteration`. Other items are returned as they are.
    /// Returns `None` for a pool without texts.
    pub fn resolve<R: Rng>(
        &self,
        iteration: usize,
        take_random: bool,
        rng: &mut R,
    ) -> Option<Cow<'_, WorkItem>> {
        match self {
            WorkItem::Pool { link, texts } => {
                select_index(texts.len(), iteration, take_random, rng)
                    .and_then(|i| texts.get(i))
                    .map(|text| Cow::Owned(WorkItem::reply(link.clone(), text.clone())))
            }
            _ => Some(Cow::Borrowed(self)),
        }
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkItem::Target { value } | WorkItem::Text { value } => f.write_str(value),
            WorkItem::Reply { link, text } => write!(f, "{} <- {}", link, text),
            WorkItem::Pool { link, texts } => write!(f, "{} <- {} texts", link, texts.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
    Target,
    Text,
    Reply,
    Pool,
}

impl std::fmt::Display for ItemShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ItemShape::Target => "target",
            ItemShape::Text => "text",
            ItemShape::Reply => "reply",
            ItemShape::Pool => "link + texts",
        })
    }
}

/// How an account walks the item list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every item, in list order.
    #[default]
    InOrder,
    /// `len` iterations; random pick or round-robin depending on
    /// `take_data_random`.
    Pooled,
}

/// Index of the item used on `iteration` out of `len` items.
///
/// Returns `None` only when `len == 0`.
pub fn select_index<R: Rng>(
    len: usize,
    iteration: usize,
    take_random: bool,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if take_random {
        Some(rng.gen_range(0..len))
    } else {
        Some(iteration % len)
    }
}
