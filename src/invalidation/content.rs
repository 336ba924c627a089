//! Content Types and the Trigger Table
//!
//! Maps each logical content type to the cache namespaces it purges and the
//! external query-cache keys it marks stale. The table is fixed configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResilienceError;

// == Content Type ==
/// Closed set of entity types whose mutation triggers invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Calendar,
    Projects,
    Stories,
    Tasks,
    Users,
    Attendance,
}

// == Invalidation Rule ==
/// What a content type invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidationRule {
    /// Cache namespace tokens purged locally
    pub triggers: &'static [&'static str],
    /// External query-cache key tokens marked stale
    pub related_queries: &'static [&'static str],
}

impl ContentType {
    /// Every content type, in declaration order.
    pub const ALL: [ContentType; 6] = [
        ContentType::Calendar,
        ContentType::Projects,
        ContentType::Stories,
        ContentType::Tasks,
        ContentType::Users,
        ContentType::Attendance,
    ];

    /// Returns the lowercase name used in keys, logs and URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Calendar => "calendar",
            ContentType::Projects => "projects",
            ContentType::Stories => "stories",
            ContentType::Tasks => "tasks",
            ContentType::Users => "users",
            ContentType::Attendance => "attendance",
        }
    }

    /// Returns the invalidation rule for this content type.
    pub fn rule(self) -> InvalidationRule {
        match self {
            ContentType::Calendar => InvalidationRule {
                triggers: &["calendar", "events"],
                related_queries: &["calendar", "calendar-events"],
            },
            ContentType::Projects => InvalidationRule {
                triggers: &["projects", "project-stats"],
                related_queries: &["projects", "project-details"],
            },
            ContentType::Stories => InvalidationRule {
                triggers: &["stories", "story-types"],
                related_queries: &["stories", "story-types"],
            },
            ContentType::Tasks => InvalidationRule {
                triggers: &["tasks", "task-lists"],
                related_queries: &["tasks", "task-lists"],
            },
            ContentType::Users => InvalidationRule {
                triggers: &["users", "user-profiles"],
                related_queries: &["users", "profiles"],
            },
            ContentType::Attendance => InvalidationRule {
                triggers: &["attendance", "attendance-stats"],
                related_queries: &["attendance"],
            },
        }
    }

    /// Union of every trigger in the table, without duplicates, in table order.
    pub fn all_namespaces() -> Vec<&'static str> {
        let mut namespaces: Vec<&'static str> = Vec::new();
        for content_type in Self::ALL {
            for &trigger in content_type.rule().triggers {
                if !namespaces.contains(&trigger) {
                    namespaces.push(trigger);
                }
            }
        }
        namespaces
    }

    /// Union of every related query token in the table, without duplicates.
    pub fn all_related_queries() -> Vec<&'static str> {
        let mut queries: Vec<&'static str> = Vec::new();
        for content_type in Self::ALL {
            for &query in content_type.rule().related_queries {
                if !queries.contains(&query) {
                    queries.push(query);
                }
            }
        }
        queries
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ResilienceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|content_type| content_type.as_str() == name)
            .ok_or_else(|| ResilienceError::UnknownContentType(s.to_string()))
    }
}
