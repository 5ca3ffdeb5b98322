//! Plain-text rendering of notes and errors.

use papertrail_core::{Error, ErrorKind, Note, User};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One line per note: id, last change, title, category and tags.
pub fn note_line(note: &Note) -> String {
    let mut line = format!(
        "{:>6}  {}  {}",
        note.id.to_string(),
        note.updated_at.format(TIME_FORMAT),
        note.title
    );
    if let Some(category) = &note.category {
        line.push_str(&format!("  [{}]", category));
    }
    if !note.tags.is_empty() {
        let tags: Vec<String> = note.tags.iter().map(|t| format!("#{}", t)).collect();
        line.push_str("  ");
        line.push_str(&tags.join(" "));
    }
    line
}

pub fn note_list(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "No notes.".to_string();
    }
    notes.iter().map(note_line).collect::<Vec<_>>().join("\n")
}

/// Full note with header fields and body.
pub fn note_detail(note: &Note) -> String {
    let mut out = format!("# {}\n", note.title);
    out.push_str(&format!("id:       {}\n", note.id));
    out.push_str(&format!(
        "category: {}\n",
        note.category.as_deref().unwrap_or("-")
    ));
    if !note.tags.is_empty() {
        out.push_str(&format!("tags:     {}\n", note.tags.join(", ")));
    }
    out.push_str(&format!(
        "created:  {}\n",
        note.created_at.format(TIME_FORMAT)
    ));
    out.push_str(&format!(
        "updated:  {}\n",
        note.updated_at.format(TIME_FORMAT)
    ));
    out.push('\n');
    out.push_str(&note.content);
    out
}

pub fn user_line(user: &User) -> String {
    match user.id {
        Some(id) => format!("{} (id {})", user.username, id),
        None => user.username.clone(),
    }
}

/// User-facing message for a failed command.
pub fn error_message(err: &anyhow::Error) -> String {
    let Some(client_err) = err.downcast_ref::<Error>() else {
        return format!("{:#}", err);
    };
    match client_err.kind() {
        ErrorKind::Unauthorized => format!(
            "{}\nYour session is not valid. Run `papertrail login`.",
            client_err
        ),
        ErrorKind::NetworkUnreachable => format!(
            "{}\nCheck that the server is running and PAPERTRAIL_BASE_URL is correct.",
            client_err
        ),
        _ => client_err.to_string(),
    }
}
