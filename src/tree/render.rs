//! Box-drawing rendering of a built forest.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::TreeNode;
use crate::models::{Container, EntityRef, Temperature, Thread, short_id};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const EMPTY: &str = "    ";

const CONTAINER_MARKER: char = '▣';
const STAR: char = '★';
const NO_STAR: char = '☆';
const MAX_IMPORTANCE: u8 = 5;

/// Header text of the ungrouped bucket.
pub const UNGROUPED_HEADER: &str = "Ungrouped";

/// What a rendered line is, so styling never has to parse text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum LineRole {
    GroupHeader,
    UngroupedHeader,
    Thread { temperature: Temperature },
    Container,
    Separator,
}

/// One line of tree output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    #[serde(flatten)]
    pub role: LineRole,
    pub text: String,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render a forest using the current time for temperatures.
pub fn render(forest: &[TreeNode<'_>]) -> Vec<Line> {
    render_at(forest, Utc::now())
}

/// Render a forest with temperatures computed as of `now`.
///
/// Example output:
/// ```text
/// Alpha
/// ├── ▣ Infra [ct-7e21a]
/// │   └── Upgrade CI [th-c0ffe] #ops · tepid · ★★★☆☆
/// └── Write docs [th-91b2d] · frozen · ★☆☆☆☆
///
/// ```
pub fn render_at(forest: &[TreeNode<'_>], now: DateTime<Utc>) -> Vec<Line> {
    let mut lines = Vec::new();
    // Popped from the back, so everything is pushed in reverse.
    let mut work: Vec<Step<'_, '_>> = Vec::new();
    push_children(&mut work, forest, "");

    while let Some(step) = work.pop() {
        let Step::Node {
            node,
            prefix,
            is_last,
        } = step
        else {
            lines.push(separator());
            continue;
        };

        match node {
            TreeNode::Group { group, children } => {
                lines.push(Line {
                    role: LineRole::GroupHeader,
                    text: group.name.clone(),
                });
                work.push(Step::Separator);
                push_children(&mut work, children, "");
            }
            TreeNode::Ungrouped { children } => {
                lines.push(Line {
                    role: LineRole::UngroupedHeader,
                    text: UNGROUPED_HEADER.to_string(),
                });
                work.push(Step::Separator);
                push_children(&mut work, children, "");
            }
            TreeNode::Entity { entity, children } => {
                let connector = if is_last { LAST_BRANCH } else { BRANCH };
                let (role, label) = match entity {
                    EntityRef::Thread(thread) => {
                        let temperature = thread.temperature_at(now);
                        (
                            LineRole::Thread { temperature },
                            thread_label(thread, temperature),
                        )
                    }
                    EntityRef::Container(container) => {
                        (LineRole::Container, container_label(container))
                    }
                };
                lines.push(Line {
                    role,
                    text: format!("{}{}{}", prefix, connector, label),
                });

                let continuation = if is_last { EMPTY } else { VERTICAL };
                push_children(&mut work, children, &format!("{}{}", prefix, continuation));
            }
        }
    }
    lines
}

/// Render a forest to plain strings, using the current time.
pub fn render_text(forest: &[TreeNode<'_>]) -> Vec<String> {
    render(forest).into_iter().map(|line| line.text).collect()
}

/// Pending output: a node still to draw, or the blank line closing a bucket.
enum Step<'n, 'a> {
    Node {
        node: &'n TreeNode<'a>,
        prefix: String,
        is_last: bool,
    },
    Separator,
}

fn push_children<'n, 'a>(work: &mut Vec<Step<'n, 'a>>, children: &'n [TreeNode<'a>], prefix: &str) {
    let last = children.len().saturating_sub(1);
    for (i, node) in children.iter().enumerate().rev() {
        work.push(Step::Node {
            node,
            prefix: prefix.to_string(),
            is_last: i == last,
        });
    }
}

fn separator() -> Line {
    Line {
        role: LineRole::Separator,
        text: String::new(),
    }
}

fn tag_suffix(tags: &[String]) -> String {
    tags.first()
        .map(|tag| format!(" #{}", tag))
        .unwrap_or_default()
}

fn stars(importance: u8) -> String {
    let filled = importance.min(MAX_IMPORTANCE) as usize;
    let mut out = String::with_capacity(MAX_IMPORTANCE as usize * 3);
    out.extend(std::iter::repeat_n(STAR, filled));
    out.extend(std::iter::repeat_n(NO_STAR, MAX_IMPORTANCE as usize - filled));
    out
}

/// `name [short-id] #tag · temperature · stars`
fn thread_label(thread: &Thread, temperature: Temperature) -> String {
    format!(
        "{} [{}]{} · {} · {}",
        thread.name,
        short_id(&thread.id),
        tag_suffix(&thread.tags),
        temperature,
        stars(thread.importance)
    )
}

/// `▣ name [short-id] #tag`
fn container_label(container: &Container) -> String {
    format!(
        "{} {} [{}]{}",
        CONTAINER_MARKER,
        container.name,
        short_id(&container.id),
        tag_suffix(&container.tags)
    )
}
