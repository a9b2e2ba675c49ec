//! Prompt templates for the mediator and child personas.
//!
//! The observer template is the extraction contract: it teaches the model
//! by example which phrasings map to which intent, and pins the output to a
//! single JSON object. The persona prompts shape the conversational replies.

use french_core::types::{Task, TaskStatus};

/// Formal, parent-facing mediator persona.
pub const MEDIATOR_PARENT_PROMPT: &str = "\
You are Mr. French, a sophisticated AI assistant helping a parent manage their child, Timmy.
You are professional, polite, and helpful. Write like a chat message, not an email, and avoid
bullet points unless you are listing tasks. Maintain contextual awareness of the conversation.";

/// Warm, child-facing mediator persona.
pub const MEDIATOR_CHILD_PROMPT: &str = "\
You are Mr. French, a kind and supportive AI companion for Timmy.
You are patient, encouraging, and friendly. You are not always enforcing tasks; you can also
chat normally. Keep your replies short and age-appropriate.";

/// The Timmy persona used for replies on the parent-child channel.
pub const CHILD_PROMPT: &str = "\
You are Timmy, a lively and sometimes slightly cheeky child.
Respond naturally and briefly to your parent. Your replies should reflect a child's
personality: occasional resistance to chores, but also willingness to cooperate or share
feelings. Keep the vocabulary age-appropriate.";

/// Fixed apology used when reply generation itself fails.
pub const GENERATION_APOLOGY: &str = "I'm sorry, I'm having trouble responding right now.";

/// Fallback reply when the analyzer output cannot be understood.
pub const EXTRACTION_APOLOGY: &str =
    "I'm having a bit of trouble understanding that. Could you rephrase?";

/// Generic reply when a store operation fails mid-action.
pub const STORE_TROUBLE: &str = "I'm having trouble processing that right now. Please try again.";

/// The observer/analyzer instruction with the live task context injected.
pub fn observer_prompt(task_context: &str) -> String {
    format!(
        r#"You are Mr. French, a sophisticated AI observing a family conversation.
Your role here is to analyze the latest user message for task-related intents only.
Classify it as one of: ADD_TASK, UPDATE_TASK, DELETE_TASK, QUERY_TASKS,
SET_TIMMY_ZONE_RED, SET_TIMMY_ZONE_GREEN, SET_TIMMY_ZONE_BLUE, NO_TASK_IDENTIFIED.

Recognition rules:
- ADD_TASK: direct commands ("Timmy, clean your room"), polite requests, instructions,
  and self-assignments ("I will do X tonight"). Extract 'task' (short description),
  'is_completed' ('Pending', 'Progress', or 'Completed'), 'Due_Date' ('Today', 'Tomorrow',
  a weekday name, 'YYYY-MM-DD', or 'Unknown'), 'Due_Time' ('8 AM', '21:00', 'evening',
  'tonight', 'morning', or 'Unknown'), and 'Reward' ('None' if no reward is mentioned).
  If the date is not mentioned, use 'Today'. If the time is not mentioned, use 'Unknown'.
- UPDATE_TASK: completion or progress phrasing ("I finished X", "I'm done", "I started X",
  "I already did it"). Set 'original_task_name' to the closest matching task from the
  context below; it does not need to match the user's wording exactly. Put the changed
  fields in an 'updates' object, e.g. {{"is_completed": "Completed"}}.
- DELETE_TASK: cancellation phrasing ("Timmy doesn't have to do X anymore"). Extract 'task'.
- QUERY_TASKS: questions about tasks or progress. Extract 'filter': 'All', 'Pending',
  'Progress', 'Completed', or a task-name fragment.
- SET_TIMMY_ZONE_*: explicit zone commands ("put Timmy in the red zone"). Extract 'zone'.
- NO_TASK_IDENTIFIED: everything else.

Respond with exactly one JSON object and nothing else.

Examples:
- {{"intent": "ADD_TASK", "task": "Clean your room", "is_completed": "Pending", "Due_Date": "Today", "Due_Time": "Evening", "Reward": "None"}}
- {{"intent": "UPDATE_TASK", "original_task_name": "Watch F1 movie", "updates": {{"is_completed": "Completed"}}}}
- {{"intent": "UPDATE_TASK", "original_task_name": "Do homework", "updates": {{"Due_Date": "Tomorrow"}}}}
- {{"intent": "DELETE_TASK", "task": "Take out the trash"}}
- {{"intent": "QUERY_TASKS", "filter": "Pending"}}
- {{"intent": "SET_TIMMY_ZONE_RED", "zone": "Red"}}
- {{"intent": "NO_TASK_IDENTIFIED"}}

{task_context}"#
    )
}

/// Render the task store as a context block for the observer prompt and for
/// inquiry replies. Tasks are grouped by status; an empty store yields an
/// explicit sentence rather than an empty block.
pub fn task_context(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "There are no tasks to report at the moment.".to_string();
    }

    let mut out = String::from("Current tasks:");
    for status in [TaskStatus::Pending, TaskStatus::Progress, TaskStatus::Completed] {
        let group: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
        if group.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}:", status));
        for task in group {
            out.push_str(&format!(
                "\n- '{}' (Due: {} {}",
                task.task, task.due_date, task.due_time
            ));
            if task.reward != "None" {
                out.push_str(&format!(", Reward: {}", task.reward));
            }
            out.push(')');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use french_core::types::Timestamp;
    use uuid::Uuid;

    fn task(name: &str, status: TaskStatus, reward: &str) -> Task {
        Task {
            id: Uuid::new_v4(),
            task: name.to_string(),
            status,
            due_date: "Today".to_string(),
            due_time: "evening".to_string(),
            reward: reward.to_string(),
            recurrence: None,
            updated_at: Timestamp::now(),
        }
    }

    #[test]
    fn test_empty_store_renders_no_tasks_sentence() {
        assert_eq!(
            task_context(&[]),
            "There are no tasks to report at the moment."
        );
    }

    #[test]
    fn test_tasks_grouped_by_status() {
        let tasks = vec![
            task("Clean room", TaskStatus::Pending, "None"),
            task("Do homework", TaskStatus::Completed, "None"),
            task("Read book", TaskStatus::Pending, "None"),
        ];
        let ctx = task_context(&tasks);
        let pending_pos = ctx.find("Pending:").unwrap();
        let completed_pos = ctx.find("Completed:").unwrap();
        assert!(pending_pos < completed_pos);
        assert!(ctx.contains("'Clean room'"));
        assert!(ctx.contains("'Read book'"));
        assert!(ctx.contains("'Do homework'"));
    }

    #[test]
    fn test_reward_shown_only_when_present() {
        let tasks = vec![
            task("Clean room", TaskStatus::Pending, "None"),
            task("Do laundry", TaskStatus::Pending, "new video game"),
        ];
        let ctx = task_context(&tasks);
        assert!(ctx.contains("Reward: new video game"));
        assert_eq!(ctx.matches("Reward:").count(), 1);
    }

    #[test]
    fn test_observer_prompt_embeds_context() {
        let prompt = observer_prompt("There are no tasks to report at the moment.");
        assert!(prompt.contains("ADD_TASK"));
        assert!(prompt.contains("exactly one JSON object"));
        assert!(prompt.ends_with("There are no tasks to report at the moment."));
    }
}
