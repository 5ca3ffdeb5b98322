//! Subcommands and their handlers.

use std::io::Write;

use anyhow::{bail, Result};
use clap::Subcommand;
use papertrail_client::{CategoryFilter, NoteQuery, PaperTrail, SortKey};
use papertrail_core::{Credentials, DeleteOutcome, NoteDraft, NoteId, NotePatch};

use crate::render;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account (does not sign in)
    Register {
        username: String,

        /// Password
        #[arg(short, long, env = "PAPERTRAIL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign in and remember the session
    Login {
        username: String,

        /// Password
        #[arg(short, long, env = "PAPERTRAIL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List notes
    List {
        /// Only notes whose title, content or tags contain this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only notes in this category ("all" for every note)
        #[arg(short, long, default_value_t)]
        category: CategoryFilter,

        /// Sort order: created, updated or title
        #[arg(long, default_value_t)]
        sort: SortKey,
    },

    /// List the categories in use
    Categories,

    /// Show one note
    Show { id: NoteId },

    /// Create a note
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short = 'b', long)]
        content: String,

        #[arg(short, long)]
        category: Option<String>,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Change fields of a note
    Edit {
        id: NoteId,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short = 'b', long)]
        content: Option<String>,

        #[arg(short, long, conflicts_with = "no_category")]
        category: Option<String>,

        /// Remove the category
        #[arg(long)]
        no_category: bool,

        /// Replace the tags (repeatable)
        #[arg(long = "tag", conflicts_with = "no_tags")]
        tags: Vec<String>,

        /// Remove every tag
        #[arg(long)]
        no_tags: bool,
    },

    /// Delete a note
    Rm { id: NoteId },

    /// Search notes on the server
    Search { query: String },
}

/// Run one command against a restored context, writing output to `out`.
pub async fn execute<W: Write>(ctx: &PaperTrail, command: Command, out: &mut W) -> Result<()> {
    let session = ctx.session();
    let notes = ctx.notes();

    match command {
        Command::Register { username, password } => {
            let credentials = Credentials::new(username, password);
            let name = credentials.username.trim().to_string();
            session.register(credentials).await?;
            writeln!(
                out,
                "Registered {}. Run `papertrail login` to sign in.",
                name
            )?;
        }
        Command::Login { username, password } => {
            if let Some(user) = session.user() {
                writeln!(out, "Already logged in as {}", render::user_line(&user))?;
                return Ok(());
            }
            let user = session.login(Credentials::new(username, password)).await?;
            writeln!(out, "Logged in as {}", render::user_line(&user))?;
        }
        Command::Logout => {
            if session.is_authenticated() {
                session.logout().await?;
                writeln!(out, "Logged out.")?;
            } else {
                writeln!(out, "Not logged in.")?;
            }
        }
        Command::Whoami => match session.user() {
            Some(user) => writeln!(out, "{}", render::user_line(&user))?,
            None => writeln!(out, "Not logged in.")?,
        },
        Command::List {
            search,
            category,
            sort,
        } => {
            require_login(ctx)?;
            notes.load().await?;
            let query = NoteQuery::new()
                .search(search.unwrap_or_default())
                .category(category)
                .sort(sort);
            let mut view = ctx.view();
            view.set_query(query);
            writeln!(out, "{}", render::note_list(&view.notes()))?;
        }
        Command::Categories => {
            require_login(ctx)?;
            notes.load().await?;
            let categories = ctx.view().categories();
            if categories.is_empty() {
                writeln!(out, "No categories.")?;
            }
            for category in categories.iter() {
                writeln!(out, "{}", category)?;
            }
        }
        Command::Show { id } => {
            require_login(ctx)?;
            let note = notes.reload_note(id).await?;
            writeln!(out, "{}", render::note_detail(&note))?;
        }
        Command::Add {
            title,
            content,
            category,
            tags,
        } => {
            require_login(ctx)?;
            let mut draft = NoteDraft::new(title, content).with_tags(tags);
            if let Some(category) = category {
                draft = draft.with_category(category);
            }
            let note = notes.create(draft).await?;
            writeln!(out, "Created note {}", note.id)?;
        }
        Command::Edit {
            id,
            title,
            content,
            category,
            no_category,
            tags,
            no_tags,
        } => {
            require_login(ctx)?;
            let mut patch = NotePatch::new();
            if let Some(title) = title {
                patch = patch.title(title);
            }
            if let Some(content) = content {
                patch = patch.content(content);
            }
            if let Some(category) = category {
                patch = patch.category(category);
            }
            if no_category {
                patch = patch.clear_category();
            }
            if !tags.is_empty() || no_tags {
                patch = patch.tags(tags);
            }
            if patch.is_empty() {
                bail!("nothing to change; pass at least one of --title, --content, --category, --tag");
            }
            notes.load().await?;
            let note = notes.update(id, patch).await?;
            writeln!(out, "Updated note {}", note.id)?;
        }
        Command::Rm { id } => {
            require_login(ctx)?;
            match notes.delete(id).await? {
                DeleteOutcome::Deleted => writeln!(out, "Deleted note {}", id)?,
                DeleteOutcome::AlreadyGone => writeln!(out, "Note {} was already gone", id)?,
            }
        }
        Command::Search { query } => {
            require_login(ctx)?;
            let found = notes.search_remote(&query).await?;
            writeln!(out, "{}", render::note_list(&found))?;
        }
    }
    Ok(())
}

fn require_login(ctx: &PaperTrail) -> Result<()> {
    if !ctx.session().is_authenticated() {
        bail!("not logged in; run `papertrail login` first");
    }
    Ok(())
}
