//! Reduction of a run's cached write results into the artifact tree.
//!
//! A cached result shaped like a user story (an `id`, a non-null
//! `milestone`, no `user_story`) becomes a story root; a result carrying
//! `user_story` becomes a task of that story. Tasks whose story is not among
//! the cached results are dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprintloop_core::IdempotencyCache;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskArtifact {
    pub id: i64,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryArtifact {
    pub id: i64,
    pub subject: String,
    #[serde(default)]
    pub tasks: Vec<TaskArtifact>,
}

/// Entities created during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    pub milestone_id: Option<i64>,
    #[serde(default)]
    pub user_stories: Vec<StoryArtifact>,
}

impl Artifacts {
    /// Build the tree from the cache, in insertion order.
    pub fn from_cache(cache: &IdempotencyCache) -> Self {
        Self::from_results(cache.values())
    }

    /// Stories are collected in a first pass and tasks attached in a second,
    /// so a task cached before its story still lands under it.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a Value>) -> Self {
        let results: Vec<&Value> = results.into_iter().collect();
        let mut artifacts = Artifacts::default();

        for &result in &results {
            let Some(obj) = result.as_object() else {
                continue;
            };
            if obj.contains_key("user_story") {
                continue;
            }
            let (Some(id), Some(milestone)) = (
                obj.get("id").and_then(Value::as_i64),
                obj.get("milestone").and_then(Value::as_i64),
            ) else {
                continue;
            };
            artifacts.milestone_id = Some(milestone);
            if !artifacts.user_stories.iter().any(|s| s.id == id) {
                artifacts.user_stories.push(StoryArtifact {
                    id,
                    subject: subject_of(result),
                    tasks: Vec::new(),
                });
            }
        }

        for result in results {
            let Some(story_id) = result.get("user_story").and_then(Value::as_i64) else {
                continue;
            };
            let Some(id) = result.get("id").and_then(Value::as_i64) else {
                continue;
            };
            if let Some(story) = artifacts.user_stories.iter_mut().find(|s| s.id == story_id) {
                story.tasks.push(TaskArtifact {
                    id,
                    subject: subject_of(result),
                });
            }
        }

        artifacts
    }

    pub fn is_empty(&self) -> bool {
        self.milestone_id.is_none() && self.user_stories.is_empty()
    }
}

fn subject_of(result: &Value) -> String {
    result
        .get("subject")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(results: Vec<Value>) -> IdempotencyCache {
        let mut cache = IdempotencyCache::new();
        for (i, r) in results.into_iter().enumerate() {
            cache.insert(format!("k{i}"), r);
        }
        cache
    }

    #[test]
    fn builds_story_task_tree() {
        let cache = cache(vec![
            json!({"id": 101, "subject": "Login", "milestone": 6, "tags": []}),
            json!({"id": 901, "subject": "Form", "user_story": 101}),
            json!({"id": 102, "subject": "Export", "milestone": 6, "tags": []}),
            json!({"id": 902, "subject": "Validate", "user_story": 101}),
            json!({"id": 903, "subject": "CSV writer", "user_story": 102}),
        ]);

        let artifacts = Artifacts::from_cache(&cache);
        assert_eq!(artifacts.milestone_id, Some(6));
        assert_eq!(artifacts.user_stories.len(), 2);
        let login = &artifacts.user_stories[0];
        assert_eq!(login.id, 101);
        assert_eq!(
            login.tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![901, 902]
        );
        assert_eq!(artifacts.user_stories[1].tasks[0].subject, "CSV writer");
    }

    #[test]
    fn task_cached_before_its_story_still_attaches() {
        let cache = cache(vec![
            json!({"id": 901, "subject": "Form", "user_story": 101}),
            json!({"id": 101, "subject": "Login", "milestone": 6}),
        ]);
        let artifacts = Artifacts::from_cache(&cache);
        assert_eq!(artifacts.user_stories[0].tasks.len(), 1);
    }

    #[test]
    fn orphan_tasks_are_dropped() {
        let cache = cache(vec![
            json!({"id": 101, "subject": "Login", "milestone": 6}),
            json!({"id": 901, "subject": "Elsewhere", "user_story": 555}),
        ]);
        let artifacts = Artifacts::from_cache(&cache);
        assert_eq!(artifacts.user_stories.len(), 1);
        assert!(artifacts.user_stories[0].tasks.is_empty());
    }

    #[test]
    fn stories_without_sprint_are_not_roots() {
        let cache = cache(vec![
            json!({"id": 101, "subject": "Backlog item", "milestone": null}),
            json!({"id": 901, "subject": "Task", "user_story": 101}),
        ]);
        let artifacts = Artifacts::from_cache(&cache);
        assert!(artifacts.is_empty());
    }

    #[test]
    fn milestone_is_last_story_seen() {
        let cache = cache(vec![
            json!({"id": 1, "subject": "a", "milestone": 5}),
            json!({"id": 2, "subject": "b", "milestone": 6}),
        ]);
        assert_eq!(Artifacts::from_cache(&cache).milestone_id, Some(6));
    }

    #[test]
    fn non_object_results_are_ignored() {
        let cache = cache(vec![json!([1, 2]), Value::Null, json!("text")]);
        assert!(Artifacts::from_cache(&cache).is_empty());
    }

    #[test]
    fn serializes_in_response_shape() {
        let artifacts = Artifacts {
            milestone_id: Some(6),
            user_stories: vec![StoryArtifact {
                id: 101,
                subject: "Login".into(),
                tasks: vec![TaskArtifact {
                    id: 901,
                    subject: "Form".into(),
                }],
            }],
        };
        let json = serde_json::to_value(&artifacts).unwrap();
        assert_eq!(
            json,
            json!({
                "milestone_id": 6,
                "user_stories": [{"id": 101, "subject": "Login", "tasks": [{"id": 901, "subject": "Form"}]}]
            })
        );
    }
}
