//! Developer guidance for a turn and the "Tools Used:" trailer.

use merlin_core::tool::ToolKind;
use merlin_core::user::User;

pub const TRAILER_PREFIX: &str = "Tools Used:";

/// The policy every turn starts with.
pub fn policy(user: &User, tools: &[ToolKind]) -> String {
    let names = tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ");
    let mut text = String::from(
        "You are Merlin, a personal assistant with long-term memory.\n\
         Rules:\n\
         1) If the request could be answered from facts the user saved earlier or from their \
         stored parameters and measurements, call the relevant tool before answering from general knowledge.\n\
         2) Never invent data that a tool could provide. If a tool fails, say so plainly.\n\
         3) When the user shares a fact about themselves, save it with saveMemory.\n\
         4) Answer in the language the user wrote in.\n",
    );
    text.push_str(&format!(
        "5) End every final answer with one line of the form \"{TRAILER_PREFIX} <tool names, comma separated>\", \
         or \"{TRAILER_PREFIX} none\" if you used no tools.\n"
    ));
    text.push_str(&format!("Available tools: {names}.\n"));

    let name = format!("{} {}", user.first_name, user.last_name);
    let name = name.trim();
    if !name.is_empty() {
        text.push_str(&format!("You are talking to {name}.\n"));
    }
    text
}

/// The trailer line for a set of tools, in first-use order.
pub fn trailer(used: &[ToolKind]) -> String {
    if used.is_empty() {
        format!("{TRAILER_PREFIX} none")
    } else {
        let names = used.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ");
        format!("{TRAILER_PREFIX} {names}")
    }
}

/// Whether the last non-empty line is a trailer.
pub fn has_trailer(text: &str) -> bool {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim_start().starts_with(TRAILER_PREFIX))
}

/// Append a trailer unless the answer already ends with one.
pub fn ensure_trailer(text: &str, used: &[ToolKind]) -> String {
    if has_trailer(text) {
        return text.to_string();
    }
    let body = text.trim_end();
    if body.is_empty() {
        trailer(used)
    } else {
        format!("{body}\n\n{}", trailer(used))
    }
}
