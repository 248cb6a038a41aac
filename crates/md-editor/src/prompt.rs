pub const LINK_URL_PROMPT: &str = "Enter the URL of the link:";
pub const LINK_TEXT_PROMPT: &str = "Enter the text for the link:";

/// Blocking question to the user. `None` means the dialog was dismissed.
pub trait Prompt {
    fn prompt(&mut self, message: &str) -> Option<String>;
}

impl<F> Prompt for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn prompt(&mut self, message: &str) -> Option<String> {
        self(message)
    }
}

/// An empty answer counts as a cancel.
pub(crate) fn ask(prompt: &mut dyn Prompt, message: &str) -> Option<String> {
    let answer = prompt.prompt(message).filter(|answer| !answer.is_empty());
    if answer.is_none() {
        tracing::debug!(prompt = message, "prompt cancelled");
    }
    answer
}
