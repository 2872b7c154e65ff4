use super::conversation::Message;

/// One ordered generation request: fixed system instructions (with the
/// retrieved context block already folded in) followed by prior turns and
/// the new user turn as the final element of `turns`.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub turns: Vec<Message>,
}

impl Prompt {
    pub fn new(system: impl Into<String>, turns: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            turns,
        }
    }
}
