use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::models::VolunteerStatus;

/// Keeps "field absent" and "field set to null" apart on partial updates.
/// Pair with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Moves `from` to `to` unless the caller already sent `to`.
fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        map.entry(to.to_owned()).or_insert(value);
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Splits on the first whitespace run: "Ana Maria Souza" -> ("Ana", "Maria Souza").
pub fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_owned(), rest.trim().to_owned()),
        None => (trimmed.to_owned(), String::new()),
    }
}

/// Accepts snake_case volunteer bodies from older clients.
pub fn normalize_volunteer_payload(mut payload: Value) -> Value {
    let Some(map) = payload.as_object_mut() else {
        return payload;
    };

    for (from, to) in [
        ("full_name", "fullName"),
        ("first_name", "firstName"),
        ("last_name", "lastName"),
        ("entry_date", "startDate"),
        ("start_date", "startDate"),
        ("exit_date", "endDate"),
        ("end_date", "endDate"),
        ("birth_date", "birthDate"),
        ("emergency_contact", "emergencyContactName"),
        ("emergency_contact_name", "emergencyContactName"),
        ("emergency_phone", "emergencyContactPhone"),
        ("emergency_contact_phone", "emergencyContactPhone"),
    ] {
        rename_key(map, from, to);
    }

    if let Some(active) = map.remove("is_active") {
        if let Some(active) = active.as_bool() {
            let status = if active {
                VolunteerStatus::Active
            } else {
                VolunteerStatus::Inactive
            };
            map.entry("status".to_owned())
                .or_insert_with(|| Value::String(status.as_str().to_owned()));
        }
    }

    let has_parts = map.contains_key("firstName") || map.contains_key("lastName");
    if let Some(full_name) = non_empty_str(map.get("fullName")).map(str::to_owned) {
        if !has_parts {
            let (first, last) = split_full_name(&full_name);
            map.insert("firstName".to_owned(), Value::String(first));
            map.insert("lastName".to_owned(), Value::String(last));
        }
    } else if has_parts {
        let first = non_empty_str(map.get("firstName")).unwrap_or_default();
        let last = non_empty_str(map.get("lastName")).unwrap_or_default();
        let full_name = format!("{first} {last}").trim().to_owned();
        if !full_name.is_empty() {
            map.insert("fullName".to_owned(), Value::String(full_name));
        }
    }

    payload
}

/// Older clients send `schedule` and `location` as separate strings; they
/// are folded into the description.
pub fn normalize_workshop_payload(mut payload: Value) -> Value {
    let Some(map) = payload.as_object_mut() else {
        return payload;
    };

    rename_key(map, "is_active", "isActive");

    let schedule = map.remove("schedule");
    let location = map.remove("location");
    let mut extra = Vec::new();
    if let Some(schedule) = non_empty_str(schedule.as_ref()) {
        extra.push(format!("Horário: {schedule}"));
    }
    if let Some(location) = non_empty_str(location.as_ref()) {
        extra.push(format!("Local: {location}"));
    }

    if !extra.is_empty() {
        let mut lines = Vec::new();
        if let Some(description) = non_empty_str(map.get("description")) {
            lines.push(description.to_owned());
        }
        lines.extend(extra);
        map.insert("description".to_owned(), Value::String(lines.join("\n")));
    }

    payload
}

pub fn normalize_participation_payload(mut payload: Value) -> Value {
    if let Some(map) = payload.as_object_mut() {
        rename_key(map, "volunteer_id", "volunteerId");
        rename_key(map, "workshop_id", "workshopId");
    }
    payload
}
