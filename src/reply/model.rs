use crate::conversation::Conversation;
use crate::user;

/// Handle fragments that mark a contact as automated.
const BOT_MARKERS: [&str; 2] = ["gemini", "bot"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Persona,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

pub fn looks_like_bot(handle: &user::Handle) -> bool {
    BOT_MARKERS
        .iter()
        .any(|marker| handle.contains_ignore_case(marker))
}

/// A conversation is AI-driven when the sender started it with a persona
/// prompt or the sender's counterpart has a bot-like handle. Evaluated on
/// every send; the invited side of a persona conversation never triggers a
/// reply spoken for the initiator.
pub fn is_ai_driven(conversation: &Conversation, sender: &user::Id) -> bool {
    (conversation.has_persona() && conversation.is_created_by(sender))
        || conversation
            .counterpart(sender)
            .is_some_and(|p| looks_like_bot(&p.handle))
}

pub fn instruction(persona: Option<&str>, counterpart_name: &str) -> String {
    let style = "Keep replies short, casual and informal, like texting a friend. \
                 Do not act like an assistant, do not offer help, do not use lists or \
                 markdown, and never mention being an AI.";

    match persona.map(str::trim).filter(|p| !p.is_empty()) {
        Some(persona) => format!("{persona}\n\n{style}"),
        None => format!(
            "You are {counterpart_name}, chatting with someone in a direct-messaging app. {style}"
        ),
    }
}
