//! User-facing prompts, kept behind a trait so frontends decide how
//! (and whether) to ask.

use secrecy::SecretString;

/// A handle to the interactive user, if any.
///
/// Every call site in the crate treats the absence of a handle, or a
/// declined prompt, as a conservative failure; nothing is ever
/// accepted on the user's behalf.
pub trait Interaction: Send + Sync {
    /// Ask a yes/no question, e.g. whether to trust an unknown host key.
    fn prompt_yes_no(&self, message: &str) -> bool;

    /// Display an informational message.
    fn show_message(&self, message: &str);

    /// Ask for a password.
    fn get_password(&self, prompt: &str) -> Option<SecretString>;

    /// Ask for a key passphrase.
    fn get_passphrase(&self, prompt: &str) -> Option<SecretString>;
}
