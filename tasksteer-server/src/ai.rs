//! Task extraction and status suggestion through a generative model.
//!
//! All of the judgement (what counts as a task, how urgent it is, which
//! date "next Friday" means) lives in the prompt. This module builds the
//! prompts, sends them through a [`TaskModel`] and turns the replies into
//! typed values.

use async_trait::async_trait;
use serde::Deserialize;
use tasksteer_proto::task::{DEFAULT_TASK_TITLE, TaskStatus};

/// Description used when the model gives none.
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";

/// Failures talking to the model.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The request never completed.
    #[error("model request failed: {0}")]
    Transport(String),
    /// The model API answered with an error status.
    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },
    /// The API envelope could not be decoded.
    #[error("unexpected model response: {0}")]
    Response(String),
    /// A candidate's text was not a JSON task array.
    #[error("candidate is not a task array: {0}")]
    Candidate(String),
}

/// A generative model reachable with a single prompt.
#[async_trait]
pub trait TaskModel: Send + Sync {
    /// Sends `prompt` and returns the text of every candidate reply.
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, AiError>;
}

/// A task as proposed by the model, before it is assigned an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTask {
    pub title: String,
    pub description: String,
    /// Model's assignee, `None` when it named nobody.
    pub assignee: Option<String>,
    /// `YYYY-MM-DD` or empty.
    pub due_date: String,
    pub status: TaskStatus,
}

/// One object of the model's JSON array. Both the prompt's key names and
/// the stored field names are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTask {
    task: Option<String>,
    title: Option<String>,
    assignee: Option<String>,
    deadline: Option<String>,
    due_date: Option<String>,
    description: Option<String>,
    status: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<RawTask> for ExtractedTask {
    fn from(raw: RawTask) -> Self {
        Self {
            title: non_empty(raw.task)
                .or_else(|| non_empty(raw.title))
                .unwrap_or_else(|| DEFAULT_TASK_TITLE.to_string()),
            description: non_empty(raw.description)
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            assignee: non_empty(raw.assignee),
            due_date: non_empty(raw.deadline)
                .or_else(|| non_empty(raw.due_date))
                .unwrap_or_default(),
            status: raw
                .status
                .as_deref()
                .and_then(TaskStatus::parse)
                .unwrap_or_default(),
        }
    }
}

/// Builds the extraction prompt for a transcript.
#[must_use]
pub fn extraction_prompt(transcript: &str, meeting_date: &str) -> String {
    format!(
        r#"You are a hyper-attentive Task Analyst Engine. Your primary function is to process unstructured transcripts and extract tasks with actionable intelligence. You operate under a **Zero-Miss Directive** for finding tasks and a **Full-Context Mandate** for describing them. You MUST identify every commitment, enrich it, and assign a status. You do not explain yourself; you only output the final JSON.

---
### Core Protocol: From Identification to Output

**1. Aggressive Task Identification:**
Find any statement that implies future work. This includes direct commands ("Send me the file"), pledges ("I will do it"), and implied actions.

**2. Contextual Intelligence Gathering (FOR THE `description` FIELD):**
For EVERY task, find the **'why'** behind it by searching the surrounding sentences. A good description answers "Why is this task being done?". If no context exists, use an empty string `""`.

**3. Status Assignment (FOR THE `status` FIELD - CRITICAL RULE):**
Assign ONE of the following values: `High Priority`, `To Do`, `In Progress`, `Review`, or `Completed`.

* **`High Priority`**: tasks with words like "urgent," "ASAP," "critical," "immediately," "top priority," or "needs to be done first."
* **`In Progress`**: the speaker has already started the work (e.g., "I'm already working on the slides").
* **`Review`**: checking, approving, or reviewing someone else's work (e.g., "Send me the draft for review").
* **`Completed`**: only if the speaker explicitly states the task is finished (e.g., "That's done.").
* **`To Do`**: the **default status** for any task that meets none of the criteria above.

**4. Data Point Extraction & Formatting:**
For every identified task, extract these five data points:

-   **task:** The concise imperative command (e.g., "Draft the Q3 marketing report").
-   **assignee:** The responsible person or team (e.g., "Sarah", "Marketing", "Unassigned").
-   **deadline:** The calculated `YYYY-MM-DD` date. The meeting took place on {meeting_date}; resolve relative dates ("tomorrow", "next Friday") against it. Use `""` if not specified.
-   **description:** The synthesized context gathered in Step 2.
-   **status:** The status determined in Step 3.

---
### Final Output Specification

**Schema:** A raw JSON array of objects. The output MUST start with `[` and end with `]`.

**Required Keys per object:** `task`, `assignee`, `deadline`, `description`, `status`.

---
**Transcript to Analyze:**
{transcript}
"#
    )
}

/// Builds the single-label status prompt.
#[must_use]
pub fn status_prompt(title: &str, description: &str) -> String {
    format!(
        r#"Analyze the following task and suggest the most appropriate status.
Your response must be ONLY ONE of the following exact strings: 'High Priority', 'To Do', 'In Progress', 'Review', or 'Completed'. Do not add any other text or explanation.

Task Title: "{title}"
Task Description: "{description}"

Based on the content, keywords like 'urgent', 'review', 'already started', or 'finished' should guide your choice. Default to 'To Do' if no other status fits.

Suggested Status:
"#
    )
}

/// Removes Markdown code fences the model sometimes wraps JSON in.
fn strip_fences(text: &str) -> String {
    text.trim().replace("```json", "").replace("```", "")
}

/// Parses one candidate reply into tasks.
///
/// # Errors
///
/// Returns [`AiError::Candidate`] if the text is not a JSON array of objects.
pub fn parse_candidate(text: &str) -> Result<Vec<ExtractedTask>, AiError> {
    let cleaned = strip_fences(text);
    let raw: Vec<RawTask> =
        serde_json::from_str(cleaned.trim()).map_err(|e| AiError::Candidate(e.to_string()))?;
    Ok(raw.into_iter().map(ExtractedTask::from).collect())
}

/// Extracts tasks from a transcript.
///
/// Candidates that do not parse are logged and skipped.
///
/// # Errors
///
/// Returns [`AiError`] if the model cannot be reached or answers with an error.
pub async fn extract_tasks(
    model: &dyn TaskModel,
    transcript: &str,
    meeting_date: &str,
) -> Result<Vec<ExtractedTask>, AiError> {
    let candidates = model
        .generate(&extraction_prompt(transcript, meeting_date))
        .await?;

    let mut tasks = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        match parse_candidate(candidate) {
            Ok(parsed) => tasks.extend(parsed),
            Err(e) => {
                tracing::warn!(candidate = index, error = %e, "skipping unparseable candidate");
            }
        }
    }
    tracing::info!(count = tasks.len(), "tasks extracted from transcript");
    Ok(tasks)
}

/// Asks the model for the most fitting status of a task.
///
/// A reply that is not exactly one of the labels falls back to
/// [`TaskStatus::ToDo`].
///
/// # Errors
///
/// Returns [`AiError`] if the model cannot be reached or answers with an error.
pub async fn suggest_status(
    model: &dyn TaskModel,
    title: &str,
    description: &str,
) -> Result<TaskStatus, AiError> {
    let candidates = model.generate(&status_prompt(title, description)).await?;
    let reply = candidates.first().map(|s| s.trim()).unwrap_or_default();

    match TaskStatus::ALL.into_iter().find(|s| s.label() == reply) {
        Some(status) => Ok(status),
        None => {
            tracing::warn!(reply, "model returned an invalid status, defaulting to To Do");
            Ok(TaskStatus::ToDo)
        }
    }
}
