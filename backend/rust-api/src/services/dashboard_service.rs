use std::collections::{HashMap, HashSet};

use futures::try_join;

use crate::models::administrator::{Administrator, AdministratorRow};
use crate::models::auth::SessionUser;
use crate::models::dashboard::{
    card_description, percentage, AdminDashboard, AdminStats, ExerciseCard, PracticantDashboard,
    RecentTopic, TopicCard, TopicDetail, TopicStatus,
};
use crate::models::exercise::Exercise;
use crate::models::exercise_pract::ExercisePract;
use crate::models::practicant::{Practicant, PracticantProfile};
use crate::models::progress::Progress;
use crate::models::richtext::plain_text;
use crate::models::submission::ExerciseState;
use crate::models::topic::{ExampleView, ResourceView, Topic};
use crate::services::progress_service::ProgressService;
use crate::services::strapi::{StrapiClient, StrapiError, StrapiQuery};
use crate::services::topic_service::TopicService;

const RECENT_TOPICS: usize = 4;

pub struct DashboardService {
    strapi: StrapiClient,
}

impl DashboardService {
    pub fn new(strapi: StrapiClient) -> Self {
        Self { strapi }
    }

    pub async fn admin(&self, email: &str) -> Result<AdminDashboard, StrapiError> {
        let admin_query = StrapiQuery::new().filter_eq(&["email_administrator"], email);
        let empty = StrapiQuery::new();

        let (administrator, practicants, topics, exercises, attempts) = try_join!(
            self.strapi.first::<Administrator>("administrators", &admin_query),
            self.strapi.list::<Practicant>("practicants", &empty),
            self.strapi.list::<Topic>("topics", &empty),
            self.strapi.list::<Exercise>("exercises", &empty),
            self.strapi.list::<ExercisePract>("exercise-practs", &empty),
        )?;

        let completed = attempts.iter().filter(|a| a.is_correct_exercise).count();
        let stats = AdminStats {
            total_practicants: practicants.len(),
            total_topics: topics.len(),
            total_exercises: exercises.len(),
            completed_exercises: completed,
            total_attempts: attempts.len(),
            success_rate: AdminStats::success_rate(completed, attempts.len()),
        };

        Ok(AdminDashboard {
            administrator: administrator.map(|record| AdministratorRow::from_record(record, false)),
            stats,
            recent_topics: topics
                .into_iter()
                .take(RECENT_TOPICS)
                .map(|topic| RecentTopic {
                    id: topic.id,
                    document_id: topic.document_id,
                    name: topic.name_topic,
                })
                .collect(),
        })
    }

    pub async fn practicant(
        &self,
        user: &SessionUser,
        topics: &TopicService,
    ) -> Result<PracticantDashboard, StrapiError> {
        let profile_query = StrapiQuery::new().filter_eq(&["email_practicant"], &user.email);
        let progress_query = StrapiQuery::new()
            .filter_eq(&["practicant", "documentId"], &user.document_id)
            .populate_list(&["topic"]);

        let (practicant, topic_list, attempts, progresses) = try_join!(
            self.strapi.first::<Practicant>("practicants", &profile_query),
            topics.list_with_exercises(),
            self.attempts_of(&user.document_id),
            self.strapi.list::<Progress>("progresses", &progress_query),
        )?;

        Ok(PracticantDashboard {
            practicant: practicant.map(PracticantProfile::from),
            topics: topic_cards(topic_list, &attempts, &progresses),
        })
    }

    /// Topic page of a practicant. Bootstraps the progress row; a failure
    /// there is logged and shows as 0.
    pub async fn topic_detail(
        &self,
        user: &SessionUser,
        topic_document_id: &str,
        topics: &TopicService,
        progress: &ProgressService,
    ) -> Result<TopicDetail, StrapiError> {
        let topic = topics.detail(topic_document_id).await?;
        let total = topic.exercises.len();

        let stored = match progress
            .bootstrap(&user.document_id, &topic.document_id, total)
            .await
        {
            Ok(row) => row.progress,
            Err(e) => {
                tracing::error!(
                    "Progress bootstrap for practicant {} topic {} failed: {}",
                    user.document_id,
                    topic.document_id,
                    e
                );
                0
            }
        };

        let attempts = self.attempts_of(&user.document_id).await?;
        let exercises = exercise_cards(&topic.exercises, &attempts);
        let completed = exercises.iter().filter(|card| card.completed).count();

        Ok(TopicDetail {
            id: topic.id,
            document_id: topic.document_id.clone(),
            name_topic: topic.name_topic.clone(),
            description: plain_text(&topic.description, "\n"),
            objectives: plain_text(&topic.objectives, "\n"),
            resources: topic.resources.iter().map(ResourceView::from).collect(),
            examples: topic.examples.iter().map(ExampleView::from).collect(),
            completed_exercises: completed,
            total_exercises: total,
            progress: stored,
            computed_progress: percentage(completed, total),
            exercises,
        })
    }

    /// Attempt records of one practicant with the exercise relation.
    pub async fn attempts_of(
        &self,
        practicant_document_id: &str,
    ) -> Result<Vec<ExercisePract>, StrapiError> {
        let query = StrapiQuery::new()
            .filter_eq(&["practicant", "documentId"], practicant_document_id)
            .populate_list(&["exercise"]);
        self.strapi.list("exercise-practs", &query).await
    }
}

fn attempted_exercise(attempt: &ExercisePract) -> Option<&str> {
    attempt
        .exercise
        .as_ref()
        .map(|exercise| exercise.document_id.as_str())
        .filter(|id| !id.is_empty())
}

fn topic_cards(topics: Vec<Topic>, attempts: &[ExercisePract], progresses: &[Progress]) -> Vec<TopicCard> {
    let solved: HashSet<&str> = attempts
        .iter()
        .filter(|a| a.is_correct_exercise)
        .filter_map(attempted_exercise)
        .collect();
    let stored: HashMap<&str, u8> = progresses
        .iter()
        .filter_map(|row| {
            row.topic
                .as_ref()
                .map(|topic| (topic.document_id.as_str(), row.progress))
        })
        .collect();

    topics
        .into_iter()
        .map(|topic| {
            let completed = topic
                .exercises
                .iter()
                .filter(|exercise| solved.contains(exercise.document_id.as_str()))
                .count();
            let progress = stored.get(topic.document_id.as_str()).copied().unwrap_or(0);
            TopicCard {
                id: topic.id,
                description: card_description(&plain_text(&topic.description, " ")),
                exercises: topic.exercises.len(),
                completed,
                progress,
                status: TopicStatus::from_progress(progress),
                document_id: topic.document_id,
                title: topic.name_topic,
            }
        })
        .collect()
}

/// State per exercise from the latest attempt; completed once any attempt
/// was correct.
fn exercise_cards(exercises: &[Exercise], attempts: &[ExercisePract]) -> Vec<ExerciseCard> {
    let mut latest: HashMap<&str, &ExercisePract> = HashMap::new();
    let mut solved: HashSet<&str> = HashSet::new();
    for attempt in attempts {
        let Some(exercise) = attempted_exercise(attempt) else {
            continue;
        };
        if attempt.is_correct_exercise {
            solved.insert(exercise);
        }
        let newer = latest
            .get(exercise)
            .map_or(true, |seen| (attempt.created_at, attempt.id) > (seen.created_at, seen.id));
        if newer {
            latest.insert(exercise, attempt);
        }
    }

    exercises
        .iter()
        .map(|exercise| {
            let key = exercise.document_id.as_str();
            let state = match latest.get(key) {
                Some(attempt) if attempt.is_correct_exercise => ExerciseState::Correct,
                Some(_) => ExerciseState::Incorrect,
                None => ExerciseState::Idle,
            };
            ExerciseCard {
                id: exercise.id,
                document_id: exercise.document_id.clone(),
                name_exercise: exercise.name_exercise.clone(),
                description_exercise: plain_text(&exercise.description_exercise, "\n"),
                example_code: exercise.example_code.clone(),
                hints: exercise.hints.iter().map(|h| h.hint_text.clone()).collect(),
                state,
                completed: solved.contains(key),
            }
        })
        .collect()
}
