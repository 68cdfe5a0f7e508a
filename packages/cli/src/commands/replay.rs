use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use quill_editor::{Editor, EditorConfig, Key, Mark, MentionItem, Selection};
use serde::Deserialize;
use std::path::PathBuf;

use super::read_input;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON script of editing actions (`-` for stdin)
    pub script: PathBuf,

    /// Initial document (overrides the config's content)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Print the document after every action
    #[arg(short, long)]
    pub trace: bool,
}

/// A replayable editing script
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Script {
    #[serde(default)]
    mentions: Option<Vec<MentionItem>>,
    actions: Vec<Action>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Action {
    /// Typed one character at a time; `\n` presses Enter
    Type { text: String },
    Key { key: KeyName },
    Select { anchor: usize, head: Option<usize> },
    Undo,
    Redo,
    ToggleMark { mark: MarkName, href: Option<String> },
    Heading { level: u8 },
    Callout { kind: String },
    InlineMath { latex: String },
    BlockMath { latex: String },
    Image { src: String, alt: Option<String> },
    PickMention { index: usize },
    /// Nested actions that undo as one step
    Batch {
        description: Option<String>,
        actions: Vec<Action>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum KeyName {
    Enter,
    Backspace,
    ArrowUp,
    ArrowDown,
    Escape,
}

impl From<KeyName> for Key {
    fn from(key: KeyName) -> Self {
        match key {
            KeyName::Enter => Key::Enter,
            KeyName::Backspace => Key::Backspace,
            KeyName::ArrowUp => Key::ArrowUp,
            KeyName::ArrowDown => Key::ArrowDown,
            KeyName::Escape => Key::Escape,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum MarkName {
    Bold,
    Italic,
    Strike,
    Code,
    Highlight,
    Link,
}

fn to_mark(name: MarkName, href: Option<String>) -> Mark {
    match name {
        MarkName::Bold => Mark::Bold,
        MarkName::Italic => Mark::Italic,
        MarkName::Strike => Mark::Strike,
        MarkName::Code => Mark::Code,
        MarkName::Highlight => Mark::Highlight { color: None },
        MarkName::Link => Mark::link(href.unwrap_or_default()),
    }
}

/// Run a script of editing actions against a fresh editor
pub fn replay(args: ReplayArgs, mut config: EditorConfig) -> Result<()> {
    let script: Script = serde_json::from_str(&read_input(&args.script)?)
        .with_context(|| format!("Invalid replay script {}", args.script.display()))?;

    if let Some(content) = &args.content {
        config.content = read_input(content)?;
    }
    let content = run_script(&script, config, |index, action, editor| {
        if args.trace {
            eprintln!("{} {:?}", format!("[{}]", index).dimmed(), action);
            eprintln!("    {}", editor.get_content());
        }
    })?;
    println!("{}", content);
    Ok(())
}

fn run_script<F>(script: &Script, mut config: EditorConfig, mut observe: F) -> Result<String>
where
    F: FnMut(usize, &Action, &Editor),
{
    if let Some(mentions) = &script.mentions {
        config.mentions = mentions.clone();
    }
    let mut editor = Editor::new(config)?;
    editor.focus();

    for (index, action) in script.actions.iter().enumerate() {
        apply_action(&mut editor, action).with_context(|| format!("Action {} ({:?}) failed", index, action))?;
        observe(index, action, &editor);
    }

    Ok(editor.get_content())
}

fn apply_action(editor: &mut Editor, action: &Action) -> Result<()> {
    match action.clone() {
        Action::Type { text } => editor.type_text(&text)?,
        Action::Key { key } => {
            editor.handle_key(key.into())?;
        }
        Action::Select { anchor, head } => editor.set_selection(Selection::new(anchor, head.unwrap_or(anchor)))?,
        Action::Undo => {
            editor.undo()?;
        }
        Action::Redo => {
            editor.redo()?;
        }
        Action::ToggleMark { mark, href } => editor.toggle_mark(to_mark(mark, href))?,
        Action::Heading { level } => editor.set_heading(level)?,
        Action::Callout { kind } => editor.set_callout(&kind)?,
        Action::InlineMath { latex } => editor.insert_inline_math(&latex)?,
        Action::BlockMath { latex } => editor.insert_block_math(&latex)?,
        Action::Image { src, alt } => editor.insert_image(&src, alt.as_deref(), None)?,
        Action::PickMention { index } => {
            if !editor.click_suggestion(index)? {
                eprintln!("{} no suggestion at index {}", "!".yellow(), index);
            }
        }
        Action::Batch { description, actions } => {
            let mut failure = None;
            editor.batch(description.as_deref().unwrap_or("batch"), |editor| {
                failure = actions.iter().find_map(|action| apply_action(editor, action).err());
                Ok(())
            })?;
            if let Some(err) = failure {
                return Err(err);
            }
        }
    }
    Ok(())
}
