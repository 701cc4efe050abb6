/*
Embedded catalog of user-facing notification texts.

Usage:
    use crate::messages;
    let msg = messages::t_with("goal.completed", &[("goal", "daily steps")]);

Notes:
- Placeholders use single-brace format: `{name}`.
- Notification dedup never looks at these strings, so editing copy here does not
  re-trigger alerts that are still in their cooldown window.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

static CATALOG: OnceLock<HashMap<String, String>> = OnceLock::new();

const EN_JSON: &str = r#"
{
  "goal.completed": "🎯 Congratulations! Your goal '{goal}' is completed.",
  "goal.near_completion": "💪 You're close! Your goal '{goal}' is 80% complete.",
  "goal.overdue": "⏰ Reminder: You have not updated your goal '{goal}' for {days} days.",
  "workout.scheduled": "💪 New workout scheduled: {name}",
  "workout.updated": "✏️ Your workout '{name}' was updated.",
  "workout.tomorrow": "⏰ Reminder: Your workout '{name}' is scheduled for tomorrow.",
  "workout.starting_soon": "⏰ Get ready! Your workout '{name}' starts at {time}"
}
"#;

fn build_catalog() -> HashMap<String, String> {
    serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in messages module: {}", e);
    })
}

fn catalog() -> &'static HashMap<String, String> {
    CATALOG.get_or_init(build_catalog)
}

/// Look up `key`, returning the key itself when it is missing (useful in logs).
pub fn t(key: &str) -> String {
    catalog()
        .get(key)
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// Look up `key` and substitute `{name}` placeholders.
pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    let mut s = t(key);
    for (k, v) in params {
        s = s.replace(&format!("{{{}}}", k), v);
    }
    s
}
