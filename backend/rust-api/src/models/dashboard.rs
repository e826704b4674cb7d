use serde::Serialize;

use super::administrator::AdministratorRow;
use super::practicant::PracticantProfile;
use super::submission::ExerciseState;
use super::topic::{ExampleView, ResourceView};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AdminStats {
    pub total_practicants: usize,
    pub total_topics: usize,
    pub total_exercises: usize,
    pub completed_exercises: usize,
    pub total_attempts: usize,
    pub success_rate: u8,
}

impl AdminStats {
    pub fn success_rate(completed: usize, attempts: usize) -> u8 {
        percentage(completed, attempts)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentTopic {
    pub id: i64,
    pub document_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub administrator: Option<AdministratorRow>,
    pub stats: AdminStats,
    pub recent_topics: Vec<RecentTopic>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TopicStatus {
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0 => TopicStatus::NotStarted,
            100.. => TopicStatus::Completed,
            _ => TopicStatus::InProgress,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicCard {
    pub id: i64,
    pub document_id: String,
    pub title: String,
    pub description: String,
    pub exercises: usize,
    pub completed: usize,
    pub progress: u8,
    pub status: TopicStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticantDashboard {
    pub practicant: Option<PracticantProfile>,
    pub topics: Vec<TopicCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseCard {
    pub id: i64,
    pub document_id: String,
    pub name_exercise: String,
    pub description_exercise: String,
    pub example_code: String,
    pub hints: Vec<String>,
    pub state: ExerciseState,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicDetail {
    pub id: i64,
    pub document_id: String,
    pub name_topic: String,
    pub description: String,
    pub objectives: String,
    pub resources: Vec<ResourceView>,
    pub examples: Vec<ExampleView>,
    pub exercises: Vec<ExerciseCard>,
    pub completed_exercises: usize,
    pub total_exercises: usize,
    /// Stored progress row value
    pub progress: u8,
    /// `round(completed / total * 100)` from the attempt history
    pub computed_progress: u8,
}

/// Flattened description cut to 100 characters, with "..." when cut
pub fn card_description(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(100).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// `round(part / total * 100)`, 0 when total is 0
pub fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
