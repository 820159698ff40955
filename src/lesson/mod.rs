mod repository;

use serde::{Deserialize, Deserializer, Serialize};

pub use repository::{FileLessonRepository, LessonRepository};

/// Decides which provisioner, policy and comparison rules apply to a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseMode {
    ReadOnly,
    /// Schema/data altering statements are what the lesson teaches.
    MutationTeaching,
}

impl ExerciseMode {
    pub fn allows_mutation(self) -> bool {
        self == ExerciseMode::MutationTeaching
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub practice: Vec<Exercise>,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub teaches_mutation: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Exercise {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "challenge")]
    pub prompt: String,
    #[serde(default, skip_serializing)]
    pub solution: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Challenge {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(deserialize_with = "string_or_number")]
    pub step_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing)]
    pub solution: Option<String>,
}

/// A gradable unit: either a practice exercise or a challenge step.
#[derive(Debug, Clone, Copy)]
pub enum ExerciseRef<'a> {
    Practice(&'a Exercise),
    Step(&'a Step),
}

impl<'a> ExerciseRef<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            ExerciseRef::Practice(exercise) => &exercise.id,
            ExerciseRef::Step(step) => &step.step_id,
        }
    }

    pub fn solution(&self) -> Option<&'a str> {
        let solution = match self {
            ExerciseRef::Practice(exercise) => exercise.solution.as_deref(),
            ExerciseRef::Step(step) => step.solution.as_deref(),
        };
        solution.filter(|s| !s.trim().is_empty())
    }
}

impl Lesson {
    pub fn mode(&self) -> ExerciseMode {
        if self.teaches_mutation {
            ExerciseMode::MutationTeaching
        } else {
            ExerciseMode::ReadOnly
        }
    }

    /// Practice exercises are searched before challenge steps.
    pub fn find_exercise(&self, exercise_id: &str) -> Option<ExerciseRef<'_>> {
        self.exercises().find(|exercise| exercise.id() == exercise_id)
    }

    pub fn exercises(&self) -> impl Iterator<Item = ExerciseRef<'_>> {
        self.practice.iter().map(ExerciseRef::Practice).chain(
            self.challenges
                .iter()
                .flat_map(|challenge| challenge.steps.iter().map(ExerciseRef::Step)),
        )
    }
}

/// Lesson ids end up in file names, so only a conservative alphabet is allowed.
pub fn is_valid_lesson_id(lesson_id: &str) -> bool {
    !lesson_id.is_empty()
        && lesson_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson() -> Lesson {
        serde_json::from_str(
            r#"{
                "id": "select-basics",
                "title": "Select basics",
                "quiz": [{"id": 1}],
                "practice": [
                    {"id": 1, "challenge": "List users", "solution": "SELECT name, id FROM users"},
                    {"id": "2", "challenge": "No answer yet"}
                ],
                "challenges": [
                    {"id": "c1", "title": "Warmup", "steps": [
                        {"stepId": "c1_step1", "description": "Count", "solution": "SELECT COUNT(*) FROM users"},
                        {"stepId": "1", "description": "Shadowed", "solution": "SELECT 1"}
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn numeric_ids_become_strings() {
        let lesson = lesson();
        assert_eq!(lesson.practice[0].id, "1");
        assert_eq!(lesson.practice[0].prompt, "List users");
        assert_eq!(lesson.mode(), ExerciseMode::ReadOnly);
    }

    #[test]
    fn practice_wins_over_steps_with_the_same_id() {
        let lesson = lesson();
        let exercise = lesson.find_exercise("1").unwrap();
        assert!(matches!(exercise, ExerciseRef::Practice(_)));
        assert_eq!(exercise.solution(), Some("SELECT name, id FROM users"));
    }

    #[test]
    fn steps_are_found_by_step_id() {
        let lesson = lesson();
        let step = lesson.find_exercise("c1_step1").unwrap();
        assert_eq!(step.id(), "c1_step1");
        assert_eq!(step.solution(), Some("SELECT COUNT(*) FROM users"));
        assert!(lesson.find_exercise("missing").is_none());
        assert_eq!(lesson.exercises().count(), 4);
    }

    #[test]
    fn missing_solution_is_none() {
        let lesson = lesson();
        assert_eq!(lesson.find_exercise("2").unwrap().solution(), None);
    }

    #[test]
    fn solutions_are_not_serialized() {
        let json = serde_json::to_string(&lesson()).unwrap();
        assert!(!json.contains("SELECT"));
        assert!(json.contains("teachesMutation"));
    }

    #[test]
    fn lesson_id_alphabet() {
        assert!(is_valid_lesson_id("alter-table"));
        assert!(is_valid_lesson_id("lesson_2"));
        assert!(!is_valid_lesson_id(""));
        assert!(!is_valid_lesson_id("../secrets"));
        assert!(!is_valid_lesson_id("a b"));
    }
}
