use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ContentKind {
        Article => "article",
        Video => "video",
        Course => "course",
        Asset => "asset",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ContentStatus {
        Draft => "draft",
        Review => "review",
        Published => "published",
        Archived => "archived",
    }
}

impl ContentStatus {
    pub fn can_transition_to(&self, next: ContentStatus) -> bool {
        matches!(
            (self, next),
            (ContentStatus::Draft, ContentStatus::Review)
                | (ContentStatus::Review, ContentStatus::Draft)
                | (ContentStatus::Review, ContentStatus::Published)
                | (ContentStatus::Published, ContentStatus::Archived)
                | (ContentStatus::Archived, ContentStatus::Draft)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: Uuid,
    pub title: String,
    pub kind: ContentKind,
    pub body: Option<String>,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub status: ContentStatus,
    pub author_id: Option<Uuid>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInput {
    pub title: String,
    pub kind: ContentKind,
    pub body: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ContentInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.kind != ContentKind::Article && self.url.as_deref().is_none_or(str::is_empty) {
            return Err(format!("A url is required for {} content", self.kind));
        }
        Ok(())
    }

    /// Trimmed, lowercased, de-duplicated tags in first-seen order.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStatusInput {
    pub status: ContentStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilter {
    pub kind: Option<ContentKind>,
    pub status: Option<ContentStatus>,
    pub author_id: Option<Uuid>,
    pub tag: Option<String>,
}
