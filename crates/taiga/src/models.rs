//! Taiga entities and creation payloads.
//!
//! Only the fields the agent reads are modelled; Taiga returns many more and
//! they are ignored on deserialization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A sprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: i64,
    pub name: String,
    pub project: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStory {
    pub id: i64,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project: i64,
    #[serde(default)]
    pub milestone: Option<i64>,
    #[serde(default, deserialize_with = "tags::deserialize")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub user_story: i64,
}

/// Body of `POST /userstories`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUserStory {
    #[serde(rename = "project")]
    pub project_id: i64,
    pub subject: String,
    pub description: String,
    #[serde(rename = "milestone", skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    #[serde(rename = "user_story")]
    pub user_story_id: i64,
    pub subject: String,
    pub description: String,
    #[serde(rename = "project", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
}

mod tags {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tag {
        Name(String),
        // Taiga renders tags as [name, color] pairs
        Pair(Vec<Option<String>>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let raw: Option<Vec<Tag>> = Option::deserialize(d)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| match t {
                Tag::Name(name) => Some(name),
                Tag::Pair(parts) => parts.into_iter().next().flatten(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_story_ignores_extra_fields() {
        let story: UserStory = serde_json::from_value(serde_json::json!({
            "id": 101,
            "ref": 12,
            "subject": "Login page",
            "project": 7,
            "milestone": 3,
            "tags": [["auth", "#f00"], "ui"],
            "status": 1
        }))
        .unwrap();
        assert_eq!(story.milestone, Some(3));
        assert_eq!(story.description, None);
        assert_eq!(story.tags, vec!["auth".to_string(), "ui".to_string()]);
    }

    #[test]
    fn null_tags_are_empty() {
        let story: UserStory = serde_json::from_value(serde_json::json!({
            "id": 1, "subject": "s", "project": 7, "tags": null
        }))
        .unwrap();
        assert!(story.tags.is_empty());
    }

    #[test]
    fn payloads_use_taiga_field_names() {
        let body = serde_json::to_value(NewUserStory {
            project_id: 7,
            subject: "Login page".into(),
            description: String::new(),
            milestone_id: None,
            tags: vec![],
        })
        .unwrap();
        assert_eq!(body["project"], 7);
        assert!(body.get("milestone").is_none());
        assert!(body.get("tags").is_none());

        let body = serde_json::to_value(NewTask {
            user_story_id: 101,
            subject: "Wire form".into(),
            description: "desc".into(),
            project_id: Some(7),
        })
        .unwrap();
        assert_eq!(body["user_story"], 101);
        assert_eq!(body["project"], 7);
    }
}
