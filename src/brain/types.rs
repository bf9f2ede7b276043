//! Row types and the small enums stored as text columns.

use serde::{Deserialize, Serialize};

macro_rules! text_enum {
    ($name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// SQL-compatible string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("unknown ", $what, ": {}"), s)),
                }
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| rusqlite::types::FromSqlError::Other(e.into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

text_enum!(TaskStatus, "task status", {
    Todo => "todo",
    InProgress => "in_progress",
    Done => "done",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

text_enum!(Priority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// What a piece of user feedback is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTarget {
    Summary,
    Tags,
    Concepts,
    Connections,
    Search,
    General,
}

text_enum!(FeedbackTarget, "feedback target", {
    Summary => "summary",
    Tags => "tags",
    Concepts => "concepts",
    Connections => "connections",
    Search => "search",
    General => "general",
});

/// Who proposed a connection between two notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionOrigin {
    Ai,
    Manual,
}

text_enum!(ConnectionOrigin, "connection origin", {
    Ai => "ai",
    Manual => "manual",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_project: bool,
    /// Notes directly inside this folder (not counting subfolders).
    pub note_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// A folder with its subfolders, as returned by the tree endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FolderNode {
    #[serde(flatten)]
    pub folder: Folder,
    pub children: Vec<FolderNode>,
}

/// A note (the "content" record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub folder_id: Option<String>,
    pub title: String,
    pub body: String,
    /// AI-generated summary, if the note has been analyzed.
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub note_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// `YYYY-MM-DD`.
    pub due_date: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub body: String,
    /// Distinct `{{placeholder}}` names found in `body`, in order of first use.
    pub placeholders: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub id: String,
    pub note_id: String,
    pub summary: String,
    pub key_concepts: Vec<String>,
    pub tags: Vec<String>,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub note_id: Option<String>,
    pub target: FeedbackTarget,
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
    pub all_day: bool,
    pub note_id: Option<String>,
    pub task_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A directed, labelled link between two notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteConnection {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub relationship: String,
    /// `[0.0, 1.0]`.
    pub strength: f64,
    pub origin: ConnectionOrigin,
    pub reason: Option<String>,
    pub created_at: String,
}
